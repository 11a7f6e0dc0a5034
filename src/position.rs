//! Position mapping for compiler-generated text.
//!
//! When the analysed script was produced by a template compiler, every
//! diagnostic span is translated back to the original file through the
//! compiler's segment list. Offsets outside every segment cannot be shown
//! to the user, so the diagnostic is dropped.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::diagnostics::Diagnostic;
use crate::span::SourceSpan;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentFlags {
    /// Segments with diagnostics disabled never map anything.
    #[serde(default = "enabled")]
    pub diagnostics: bool,
}

fn enabled() -> bool {
    true
}

impl Default for SegmentFlags {
    fn default() -> Self {
        Self { diagnostics: true }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingSegment {
    pub generated: SourceSpan,
    pub source: SourceSpan,
    #[serde(default)]
    pub flags: SegmentFlags,
}

impl MappingSegment {
    pub fn new(generated: SourceSpan, source: SourceSpan) -> Self {
        Self {
            generated,
            source,
            flags: SegmentFlags::default(),
        }
    }

    fn interpolate(&self, offset: u32) -> u32 {
        let generated_len = self.generated.len() as u64;
        if generated_len == 0 {
            return self.source.start;
        }
        let relative = (offset - self.generated.start) as u64;
        let scaled = relative * self.source.len() as u64 / generated_len;
        self.source.start + scaled as u32
    }
}

/// Maps a generated start offset into the original source, using the first
/// segment with `start <= offset < end`.
pub fn map_to_original(offset: u32, segments: &[MappingSegment]) -> Option<u32> {
    segments
        .iter()
        .filter(|segment| segment.flags.diagnostics)
        .find(|segment| {
            let g = segment.generated;
            (g.start <= offset && offset < g.end) || (g.is_empty() && offset == g.start)
        })
        .map(|segment| segment.interpolate(offset))
}

/// End offsets are exclusive, so they map through `start < offset <= end`.
fn map_end(offset: u32, segments: &[MappingSegment]) -> Option<u32> {
    segments
        .iter()
        .filter(|segment| segment.flags.diagnostics)
        .find(|segment| segment.generated.start < offset && offset <= segment.generated.end)
        .map(|segment| segment.interpolate(offset))
}

#[derive(Debug, Clone, Default)]
pub struct PositionMapper {
    segments: Vec<MappingSegment>,
}

impl PositionMapper {
    pub fn new(segments: Vec<MappingSegment>) -> Self {
        Self { segments }
    }

    pub fn segments(&self) -> &[MappingSegment] {
        &self.segments
    }

    pub fn map_span(&self, span: SourceSpan) -> Option<SourceSpan> {
        let start = map_to_original(span.start, &self.segments)?;
        if span.is_empty() {
            return Some(SourceSpan::new(start, start));
        }
        let end = map_end(span.end, &self.segments)?;
        Some(SourceSpan::new(start, end.max(start)))
    }

    /// Falls back to the declaration span when the reference site has no
    /// counterpart in the original text. Related spans that cannot be
    /// mapped are dropped individually.
    pub fn map_diagnostic(&self, mut diagnostic: Diagnostic) -> Option<Diagnostic> {
        let declaration = diagnostic.declaration.and_then(|span| self.map_span(span));
        let primary = match self.map_span(diagnostic.span) {
            Some(span) => span,
            None => match declaration {
                Some(span) => span,
                None => {
                    debug!(
                        code = %diagnostic.code,
                        start = diagnostic.span.start,
                        end = diagnostic.span.end,
                        "dropping diagnostic without a source position"
                    );
                    return None;
                }
            },
        };

        diagnostic.span = primary;
        diagnostic.declaration = declaration;
        diagnostic.related = diagnostic
            .related
            .iter()
            .filter_map(|span| self.map_span(*span))
            .collect();
        Some(diagnostic)
    }
}
