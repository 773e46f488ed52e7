use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Prompt for a one-shot turn (omit with --chat or --rewrite)
    pub query: Option<String>,

    /// Start an interactive chat session
    #[arg(short, long)]
    pub chat: bool,

    /// Rewrite a span of the input text and emit the edited buffer
    #[arg(short, long)]
    pub rewrite: bool,

    /// Droid (persona) to route the conversation through
    #[arg(short, long)]
    pub droid: Option<String>,

    /// Model to use
    #[arg(short, long)]
    pub model: Option<String>,

    /// Read the rewrite buffer from a file instead of stdin
    #[arg(short, long)]
    pub file: Option<PathBuf>,

    /// Byte span START..END of the buffer to rewrite (default: whole buffer)
    #[arg(long, value_parser = parse_span)]
    pub span: Option<(usize, usize)>,

    /// Write the rewritten buffer back to --file
    #[arg(long)]
    pub in_place: bool,

    /// List registered droids and exit
    #[arg(long)]
    pub list_droids: bool,
}

fn parse_span(s: &str) -> Result<(usize, usize), String> {
    let (start, end) = s
        .split_once("..")
        .ok_or_else(|| "expected START..END".to_string())?;
    let start = start
        .trim()
        .parse::<usize>()
        .map_err(|e| format!("bad start: {}", e))?;
    let end = end
        .trim()
        .parse::<usize>()
        .map_err(|e| format!("bad end: {}", e))?;
    if start > end {
        return Err(format!("start {} is past end {}", start, end));
    }
    Ok((start, end))
}
