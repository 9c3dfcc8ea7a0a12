//! Character set detection for CSV uploads.
//!
//! A byte-order mark wins outright. Otherwise `chardetng` guesses from the
//! byte statistics of the sample. There is no confidence threshold and no
//! fallback: the caller decodes with exactly the label returned here.

use chardetng::EncodingDetector;
use encoding_rs::Encoding;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DetectedEncoding {
    pub encoding: &'static Encoding,
    /// Length of the byte-order mark to skip, 0 when there is none
    pub bom_len: usize,
}

impl DetectedEncoding {
    pub fn label(&self) -> &'static str {
        self.encoding.name()
    }
}

/// Guesses the encoding of `sample`.
///
/// `is_complete` says whether the sample is the whole file; a truncated
/// sample may end mid-character and the detector must not penalise that.
/// Returns `None` for an empty sample.
pub fn detect(sample: &[u8], is_complete: bool) -> Option<DetectedEncoding> {
    if sample.is_empty() {
        return None;
    }

    if let Some((encoding, bom_len)) = Encoding::for_bom(sample) {
        return Some(DetectedEncoding { encoding, bom_len });
    }

    let mut detector = EncodingDetector::new();
    detector.feed(sample, is_complete);
    let encoding = detector.guess(None, true);
    tracing::debug!(
        "Detected encoding {} from {} byte sample",
        encoding.name(),
        sample.len()
    );
    Some(DetectedEncoding {
        encoding,
        bom_len: 0,
    })
}
