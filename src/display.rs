use console::style;

use crate::diff::{DiffLine, DiffReport, DiffSpan};

/// Render one transcript block. The first line is a `# speaker` header;
/// droid replies get markdown treatment, user prompts stay plain.
pub fn render_transcript(text: &str) {
    let mut lines = text.lines();
    match lines.next() {
        Some(header) if header.starts_with("# ") => {
            let name = &header[2..];
            println!("{}", style(name).bold().cyan());
            let body = lines.collect::<Vec<_>>().join("\n");
            if name == "you" {
                println!("{}", body);
            } else {
                render_reply(&body);
            }
        }
        _ => println!("{}", text),
    }
}

/// Render an assistant reply, using markdown formatting when the text looks
/// like markdown.
pub fn render_reply(text: &str) {
    if text.contains("```") || text.contains('*') || text.contains('`') || text.contains('#') {
        termimad::print_text(text);
    } else {
        println!("{}", text);
    }
}

/// Render a refined diff: deletions red, insertions green, the differing
/// sub-span of each paired line in reverse video.
pub fn render_diff(report: &DiffReport) {
    if report.is_empty() {
        println!("{}", style("(no changes)").dim());
        return;
    }

    let (added, removed) = report.counts();
    println!(
        "{} {}",
        style(format!("+{}", added)).green(),
        style(format!("-{}", removed)).red()
    );

    for hunk in &report.hunks {
        println!("{}", style(hunk.header()).dim());
        for line in &hunk.lines {
            match line {
                DiffLine::Context(text) => println!(" {}", style(text).dim()),
                DiffLine::Delete(span) => println!("{}{}", style("-").red(), paint_span(span, false)),
                DiffLine::Insert(span) => println!("{}{}", style("+").green(), paint_span(span, true)),
            }
        }
    }
}

fn paint_span(span: &DiffSpan, insert: bool) -> String {
    let base = |s: &str| {
        if insert {
            style(s.to_string()).green()
        } else {
            style(s.to_string()).red()
        }
    };

    match &span.emphasis {
        Some(range) if !range.is_empty() => {
            let head = &span.text[..range.start];
            let middle = &span.text[range.clone()];
            let tail = &span.text[range.end..];
            format!("{}{}{}", base(head), base(middle).reverse(), base(tail))
        }
        _ => base(&span.text).to_string(),
    }
}

pub fn render_error(err: &crate::core::error::DchatError) {
    eprintln!("{} {}", style("error:").bold().red(), err);
}

pub fn render_notice(text: &str) {
    println!("{}", style(text).dim());
}
