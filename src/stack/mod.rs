//! Layer classification by structural anchor signature.
//!
//! A raw capture of a running kernel carries its page-table root in an
//! exported symbol line of the form `SYMBOL(swapper_pg_dir)=<hex>\n`. The
//! stacker scans an unclassified layer for that line and, because large
//! images routinely contain stale or partial copies, decides between
//! multiple extracted values by majority vote. The winning anchor is what
//! the caller hands to the translation-layer constructor.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::bytes::Regex;
use tracing::debug;

use crate::layer::{Layer, LayerKind};
use crate::scan::{Pattern, PatternSet, ProgressFn};

/// A structural numeric value extracted by scanning, e.g. a page-table root.
pub type Anchor = u64;

/// Literal prefix of the kernel anchor export line.
pub const ANCHOR_PREFIX: &[u8] = b"SYMBOL(swapper_pg_dir)";

/// At most 16 hex digits: the field must fit an `Anchor` exactly.
static RE_HEX_FIELD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\A[0-9a-fA-F]{1,16}\z").expect("valid hex field regex"));

static ANCHOR_SET: Lazy<PatternSet> = Lazy::new(|| {
    PatternSet::new(vec![Pattern::KeyValue {
        prefix: ANCHOR_PREFIX.to_vec(),
    }])
    .expect("anchor pattern set is non-empty")
});

/// Attempt to classify `layer` by locating its anchor.
///
/// Layers that already sit on a translation are refused outright; stacking
/// is only meaningful on raw capture data. `None` means the signature is
/// absent or never parsed, the expected outcome for layers of another kind.
pub fn stack(layer: &dyn Layer, progress: Option<Box<ProgressFn<'_>>>) -> Option<Anchor> {
    if layer.kind() == LayerKind::Translated {
        debug!(layer = layer.name(), "already classified, refusing to stack");
        return None;
    }

    let mut candidates: Vec<Anchor> = Vec::new();
    for hit in ANCHOR_SET.scan(layer, progress) {
        let Some(value) = hit.value else { continue };
        if !RE_HEX_FIELD.is_match(&value) {
            debug!(
                layer = layer.name(),
                offset = hit.offset,
                "discarding non-hex anchor field"
            );
            continue;
        }
        // The regex admits ASCII hex only, so both conversions hold.
        let text = std::str::from_utf8(&value).expect("hex field is ASCII");
        let anchor = Anchor::from_str_radix(text, 16).expect("hex field fits u64");
        debug!(
            layer = layer.name(),
            offset = hit.offset,
            anchor = %format_args!("{anchor:#x}"),
            "anchor candidate"
        );
        candidates.push(anchor);
    }

    select_majority(&candidates)
}

/// Majority vote over the candidate multiset.
///
/// A single spurious copy of an otherwise-common line is far more likely to
/// be noise than the majority value. Ties on count break to the smallest
/// anchor, so the outcome never depends on scan order.
fn select_majority(candidates: &[Anchor]) -> Option<Anchor> {
    let mut counts: HashMap<Anchor, usize> = HashMap::new();
    for &candidate in candidates {
        *counts.entry(candidate).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then(b.0.cmp(&a.0)))
        .map(|(anchor, _)| anchor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::{BufferLayer, LayerError};

    fn layer_with_lines(lines: &[&[u8]]) -> BufferLayer {
        let mut data = Vec::new();
        for line in lines {
            data.extend_from_slice(b"filler bytes ");
            data.extend_from_slice(line);
            data.extend_from_slice(b" trailing");
        }
        BufferLayer::new("base", data)
    }

    #[test]
    fn test_majority_wins() {
        let layer = layer_with_lines(&[
            b"SYMBOL(swapper_pg_dir)=1a2b3c\n",
            b"SYMBOL(swapper_pg_dir)=ffffff\n",
            b"SYMBOL(swapper_pg_dir)=1a2b3c\n",
            b"SYMBOL(swapper_pg_dir)=1a2b3c\n",
        ]);
        assert_eq!(stack(&layer, None), Some(0x1a2b3c));
    }

    #[test]
    fn test_absent_signature_is_no_match() {
        let layer = BufferLayer::new("base", b"no kernel export lines here".to_vec());
        assert_eq!(stack(&layer, None), None);
    }

    #[test]
    fn test_translated_layer_is_refused() {
        struct Stacked;
        impl Layer for Stacked {
            fn name(&self) -> &str {
                "virtual"
            }
            fn len(&self) -> u64 {
                64
            }
            fn kind(&self) -> LayerKind {
                LayerKind::Translated
            }
            fn read(&self, _offset: u64, buf: &mut [u8]) -> Result<(), LayerError> {
                buf.fill(0);
                Ok(())
            }
        }
        assert_eq!(stack(&Stacked, None), None);
    }

    #[test]
    fn test_non_hex_fields_are_discarded() {
        let layer = layer_with_lines(&[
            b"SYMBOL(swapper_pg_dir)=not hex\n",
            b"SYMBOL(swapper_pg_dir)=1a2b3cg\n",
            b"SYMBOL(swapper_pg_dir)=2000\n",
        ]);
        assert_eq!(stack(&layer, None), Some(0x2000));
    }

    #[test]
    fn test_overlong_field_is_discarded() {
        // 17 hex digits would overflow; the line is dropped, not truncated.
        let layer = layer_with_lines(&[
            b"SYMBOL(swapper_pg_dir)=11112222333344445\n",
            b"SYMBOL(swapper_pg_dir)=beef\n",
        ]);
        assert_eq!(stack(&layer, None), Some(0xbeef));
    }

    #[test]
    fn test_select_majority_tie_breaks_to_smallest() {
        assert_eq!(select_majority(&[0x2000, 0x1000, 0x2000, 0x1000]), Some(0x1000));
        assert_eq!(select_majority(&[0x3000]), Some(0x3000));
        assert_eq!(select_majority(&[]), None);
    }
}
