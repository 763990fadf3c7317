//! Speech clips returned by the AI gateway: raw mono 16-bit PCM at 24 kHz.
//!
//! The presentation layer plays audio, not raw samples, so clips can be
//! wrapped in a minimal RIFF/WAVE container.

pub const SAMPLE_RATE: u32 = 24_000;
pub const CHANNELS: u16 = 1;
pub const BITS_PER_SAMPLE: u16 = 16;

const WAV_HEADER_LEN: usize = 44;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpeechClip {
  pcm: Vec<u8>,
}

impl SpeechClip {
  /// Wrap little-endian signed 16-bit samples. A trailing odd byte is dropped.
  pub fn from_pcm(mut pcm: Vec<u8>) -> Self {
    if pcm.len() % 2 != 0 {
      pcm.pop();
    }
    Self { pcm }
  }

  pub fn pcm(&self) -> &[u8] {
    &self.pcm
  }

  pub fn sample_count(&self) -> usize {
    self.pcm.len() / 2
  }

  pub fn duration_ms(&self) -> u64 {
    self.sample_count() as u64 * 1000 / SAMPLE_RATE as u64
  }

  /// The clip as a complete `.wav` file.
  pub fn to_wav(&self) -> Vec<u8> {
    let data_len = self.pcm.len() as u32;
    let block_align = CHANNELS * BITS_PER_SAMPLE / 8;
    let byte_rate = SAMPLE_RATE * block_align as u32;

    let mut out = Vec::with_capacity(WAV_HEADER_LEN + self.pcm.len());
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + data_len).to_le_bytes());
    out.extend_from_slice(b"WAVE");
    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes()); // PCM
    out.extend_from_slice(&CHANNELS.to_le_bytes());
    out.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
    out.extend_from_slice(&byte_rate.to_le_bytes());
    out.extend_from_slice(&block_align.to_le_bytes());
    out.extend_from_slice(&BITS_PER_SAMPLE.to_le_bytes());
    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_len.to_le_bytes());
    out.extend_from_slice(&self.pcm);
    out
  }
}
