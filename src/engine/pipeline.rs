use std::sync::Arc;

use crate::core::error::DchatError;
use crate::diff;
use crate::droids::Droid;
use crate::engine::region;
use crate::engine::Host;

/// Span of the host buffer targeted by a replace-region turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionSpec {
    pub start: usize,
    pub end: usize,
    pub prompt_had_trailing_newline: bool,
}

/// Per-turn value handed to every processor. Pre-processors see the framed
/// prompt and no result; post-processors see the original prompt and the
/// reply.
pub struct ProcessorContext<'a> {
    pub droid: &'a Droid,
    pub prompt: &'a str,
    pub result: Option<&'a str>,
    pub region: Option<RegionSpec>,
}

/// A side-effecting hook run before sending or after receiving a turn.
/// Processors never alter the prompt for the rest of the chain.
pub trait Processor: Send + Sync {
    fn apply(&self, host: &mut dyn Host, ctx: &ProcessorContext<'_>) -> Result<(), DchatError>;
}

/// Renders the outgoing prompt into the transcript.
pub struct RenderPrompt;

impl Processor for RenderPrompt {
    fn apply(&self, host: &mut dyn Host, ctx: &ProcessorContext<'_>) -> Result<(), DchatError> {
        host.render_transcript(&format!("# you\n{}\n", ctx.prompt));
        Ok(())
    }
}

/// Renders the reply into the transcript under the droid's name.
pub struct RenderReply;

impl Processor for RenderReply {
    fn apply(&self, host: &mut dyn Host, ctx: &ProcessorContext<'_>) -> Result<(), DchatError> {
        if let Some(result) = ctx.result {
            host.render_transcript(&format!("# {}\n{}\n", ctx.droid.id, result));
        }
        Ok(())
    }
}

/// Diffs the reply against the original prompt text and hands the refined
/// report to the host's diff view.
pub struct ShowDiff;

impl Processor for ShowDiff {
    fn apply(&self, host: &mut dyn Host, ctx: &ProcessorContext<'_>) -> Result<(), DchatError> {
        if let Some(result) = ctx.result {
            let report = diff::report(ctx.prompt, result);
            host.show_diff(&report);
        }
        Ok(())
    }
}

/// Replaces the targeted region of the host buffer with the reply. Only
/// ever appended per-call by a replace-region turn, never part of a droid's
/// permanent chain.
pub struct ReplaceRegion;

impl Processor for ReplaceRegion {
    fn apply(&self, host: &mut dyn Host, ctx: &ProcessorContext<'_>) -> Result<(), DchatError> {
        let spec = ctx.region.ok_or_else(|| {
            DchatError::Input("region replacement requested without a region target".to_string())
        })?;
        let result = ctx.result.ok_or_else(|| {
            DchatError::Input("region replacement requested before a reply arrived".to_string())
        })?;

        let adjusted = region::adjust_result(result, spec.prompt_had_trailing_newline);
        host.replace_range(spec.start, spec.end, &adjusted);
        Ok(())
    }
}

/// Ordered chain of global default processors; each turn runs the defaults
/// followed by the active droid's extras.
pub struct Pipeline {
    pre: Vec<Arc<dyn Processor>>,
    post: Vec<Arc<dyn Processor>>,
}

impl Pipeline {
    pub fn standard() -> Self {
        Self {
            pre: vec![Arc::new(RenderPrompt)],
            post: vec![Arc::new(RenderReply)],
        }
    }

    #[cfg(test)]
    pub fn empty() -> Self {
        Self {
            pre: Vec::new(),
            post: Vec::new(),
        }
    }

    pub fn run_pre(
        &self,
        host: &mut dyn Host,
        droid: &Droid,
        prompt: &str,
    ) -> Result<(), DchatError> {
        let ctx = ProcessorContext {
            droid,
            prompt,
            result: None,
            region: None,
        };
        for processor in self.pre.iter().chain(droid.pre.iter()) {
            processor.apply(host, &ctx)?;
        }
        Ok(())
    }

    /// `extra` is the per-call tail of the chain (region replacement); it
    /// runs after the defaults and the droid's extras and is forgotten once
    /// the turn completes.
    pub fn run_post(
        &self,
        host: &mut dyn Host,
        droid: &Droid,
        prompt: &str,
        result: &str,
        region: Option<RegionSpec>,
        extra: Option<&dyn Processor>,
    ) -> Result<(), DchatError> {
        let ctx = ProcessorContext {
            droid,
            prompt,
            result: Some(result),
            region,
        };
        for processor in self.post.iter().chain(droid.post.iter()) {
            processor.apply(host, &ctx)?;
        }
        if let Some(processor) = extra {
            processor.apply(host, &ctx)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::DiffReport;

    #[derive(Default)]
    struct RecordingHost {
        transcript: Vec<String>,
        diffs: usize,
        replacements: Vec<(usize, usize, String)>,
    }

    impl Host for RecordingHost {
        fn render_transcript(&mut self, text: &str) {
            self.transcript.push(text.to_string());
        }

        fn show_diff(&mut self, _report: &DiffReport) {
            self.diffs += 1;
        }

        fn prompt_for_text(&mut self, _label: &str) -> Option<String> {
            None
        }

        fn replace_range(&mut self, start: usize, end: usize, text: &str) {
            self.replacements.push((start, end, text.to_string()));
        }
    }

    struct Tag(&'static str);

    impl Processor for Tag {
        fn apply(
            &self,
            host: &mut dyn Host,
            ctx: &ProcessorContext<'_>,
        ) -> Result<(), DchatError> {
            host.render_transcript(&format!("{}:{}", self.0, ctx.prompt));
            Ok(())
        }
    }

    #[test]
    fn droid_pre_extras_run_after_defaults_with_the_same_prompt() {
        let mut droid = Droid::new("tagged", "sys");
        droid.pre.push(Arc::new(Tag("extra")));
        let pipeline = Pipeline {
            pre: vec![Arc::new(Tag("default"))],
            post: Vec::new(),
        };
        let mut host = RecordingHost::default();

        pipeline.run_pre(&mut host, &droid, "hello").unwrap();

        assert_eq!(host.transcript, vec!["default:hello", "extra:hello"]);
    }

    #[test]
    fn defaults_run_before_droid_extras() {
        let droid = Droid::new("diffing", "sys").with_post(Arc::new(ShowDiff));
        let pipeline = Pipeline::standard();
        let mut host = RecordingHost::default();

        pipeline
            .run_post(&mut host, &droid, "before", "after", None, None)
            .unwrap();

        assert_eq!(host.transcript.len(), 1);
        assert!(host.transcript[0].contains("after"));
        assert_eq!(host.diffs, 1);
    }

    #[test]
    fn per_call_extra_does_not_stick() {
        let droid = Droid::new("plain", "sys");
        let pipeline = Pipeline::empty();
        let mut host = RecordingHost::default();
        let region = RegionSpec {
            start: 0,
            end: 8,
            prompt_had_trailing_newline: true,
        };

        pipeline
            .run_post(
                &mut host,
                &droid,
                "fix this\n",
                "fixed",
                Some(region),
                Some(&ReplaceRegion),
            )
            .unwrap();
        pipeline
            .run_post(&mut host, &droid, "fix this\n", "fixed", Some(region), None)
            .unwrap();

        assert_eq!(host.replacements.len(), 1);
        assert_eq!(host.replacements[0], (0, 8, "fixed\n".to_string()));
    }

    #[test]
    fn replace_region_requires_a_target() {
        let droid = Droid::new("plain", "sys");
        let pipeline = Pipeline::empty();
        let mut host = RecordingHost::default();

        let err = pipeline
            .run_post(&mut host, &droid, "p", "r", None, Some(&ReplaceRegion))
            .unwrap_err();
        assert!(matches!(err, DchatError::Input(_)));
    }
}
