//! WAV encode/decode helpers.

use std::io::{self, Cursor};
use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use xtts_core::{AudioClip, XttsError, XttsResult};

fn mono_spec(sample_rate: u32) -> WavSpec {
    WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    }
}

/// Encode a clip as a complete 16-bit mono WAV in memory.
pub fn encode_wav(clip: &AudioClip) -> XttsResult<Vec<u8>> {
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = WavWriter::new(&mut cursor, mono_spec(clip.sample_rate))
            .map_err(|e| XttsError::Io(io::Error::other(e.to_string())))?;

        for &sample in clip.pcm.iter() {
            let sample_i16 = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
            writer
                .write_sample(sample_i16)
                .map_err(|e| XttsError::Io(io::Error::other(e.to_string())))?;
        }

        writer
            .finalize()
            .map_err(|e| XttsError::Io(io::Error::other(e.to_string())))?;
    }
    Ok(cursor.into_inner())
}

/// Write a clip to a 16-bit mono WAV file.
pub fn write_wav(path: impl AsRef<Path>, clip: &AudioClip) -> XttsResult<()> {
    let mut writer = WavWriter::create(path.as_ref(), mono_spec(clip.sample_rate))
        .map_err(|e| XttsError::Io(io::Error::other(e.to_string())))?;

    for &sample in clip.pcm.iter() {
        let sample_i16 = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
        writer
            .write_sample(sample_i16)
            .map_err(|e| XttsError::Io(io::Error::other(e.to_string())))?;
    }

    writer
        .finalize()
        .map_err(|e| XttsError::Io(io::Error::other(e.to_string())))?;

    Ok(())
}

/// Decode a WAV byte buffer into a clip.
///
/// Accepts integer and float formats at any bit depth; multi-channel input is
/// downmixed by taking the first channel.
pub fn decode_wav(bytes: &[u8]) -> XttsResult<AudioClip> {
    let mut reader = WavReader::new(Cursor::new(bytes))
        .map_err(|e| XttsError::audio_decode(format!("invalid wav data: {e}")))?;

    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;

    let samples: Vec<f32> = match spec.sample_format {
        SampleFormat::Int => {
            let max_val = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_val))
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| XttsError::audio_decode(format!("invalid wav samples: {e}")))?
        }
        SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| XttsError::audio_decode(format!("invalid wav samples: {e}")))?,
    };

    let pcm: Vec<f32> = if channels > 1 {
        samples.into_iter().step_by(channels).collect()
    } else {
        samples
    };

    Ok(AudioClip::new(pcm, spec.sample_rate))
}
