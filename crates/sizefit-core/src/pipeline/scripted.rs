//! Encoder test double that returns scripted output sizes.

use std::sync::{Arc, Mutex};

use crate::constraint::BYTES_PER_KB;
use crate::decode::SourceImage;
use crate::encode::{EncodeOutcome, Encoder, ImageFormat, Quality};
use crate::error::Result;

type Script = Box<dyn FnMut(Option<Quality>) -> Option<usize> + Send>;

/// Byte length of `size_kb` kilobytes.
pub(crate) fn kb(size_kb: f64) -> usize {
    (size_kb * BYTES_PER_KB) as usize
}

/// Produces zero-filled buffers whose length comes from a script.
/// `None` from the script is the encoder's "skip" signal.
pub(crate) struct ScriptedEncoder {
    format: ImageFormat,
    reference_len: usize,
    script: Mutex<Script>,
    calls: Arc<Mutex<Vec<Option<Quality>>>>,
}

impl ScriptedEncoder {
    fn new(format: ImageFormat, script: Script) -> Self {
        Self {
            format,
            reference_len: 1024,
            script: Mutex::new(script),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Size is a function of the requested quality. No quality maps to 75,
    /// a band to its upper end.
    pub(crate) fn by_quality<F>(format: ImageFormat, size: F) -> Self
    where
        F: Fn(u8) -> Option<usize> + Send + 'static,
    {
        Self::new(
            format,
            Box::new(move |quality| {
                let q = match quality {
                    Some(Quality::Single(q)) => q,
                    Some(Quality::Band { max, .. }) => max,
                    None => 75,
                };
                size(q)
            }),
        )
    }

    /// Sizes in call order; the last entry repeats once the list runs out.
    pub(crate) fn sequence(format: ImageFormat, lens: Vec<Option<usize>>) -> Self {
        let mut next = 0;
        Self::new(
            format,
            Box::new(move |_| {
                let len = lens.get(next).or(lens.last()).copied().flatten();
                next += 1;
                len
            }),
        )
    }

    pub(crate) fn with_reference_len(mut self, len: usize) -> Self {
        self.reference_len = len;
        self
    }

    /// Shared log of every `encode` call's quality.
    pub(crate) fn calls(&self) -> Arc<Mutex<Vec<Option<Quality>>>> {
        Arc::clone(&self.calls)
    }
}

impl Encoder for ScriptedEncoder {
    fn format(&self) -> ImageFormat {
        self.format
    }

    fn encode(
        &self,
        _source: &SourceImage,
        quality: Option<Quality>,
    ) -> Result<Option<EncodeOutcome>> {
        self.calls.lock().unwrap().push(quality);
        let mut script = self.script.lock().unwrap();
        let len = (&mut **script)(quality);
        Ok(len.map(|len| EncodeOutcome::new(self.format, vec![0u8; len])))
    }

    fn encode_reference(&self, _source: &SourceImage) -> Result<EncodeOutcome> {
        Ok(EncodeOutcome::new(
            self.format,
            vec![0u8; self.reference_len],
        ))
    }
}
