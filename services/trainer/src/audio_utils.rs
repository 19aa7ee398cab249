use rubato::{FastFixedIn, PolynomialDegree, Resampler};

/// Frames fed to the resampler per call.
pub const RESAMPLE_CHUNK_SIZE: usize = 1024;

/// Creates a resampler to convert between audio sample rates.
pub fn create_resampler(
    in_sampling_rate: f64,
    out_sampling_rate: f64,
    chunk_size: usize,
) -> anyhow::Result<FastFixedIn<f32>> {
    let resampler = FastFixedIn::<f32>::new(
        out_sampling_rate / in_sampling_rate,
        1.0,
        PolynomialDegree::Cubic,
        chunk_size,
        1, // mono
    )?;
    Ok(resampler)
}

/// Resamples a complete mono recording or clip.
pub fn resample(samples: &[f32], in_rate: f64, out_rate: f64) -> anyhow::Result<Vec<f32>> {
    if samples.is_empty() || (in_rate - out_rate).abs() < f64::EPSILON {
        return Ok(samples.to_vec());
    }
    let mut resampler = create_resampler(in_rate, out_rate, RESAMPLE_CHUNK_SIZE)?;
    let mut resampled =
        Vec::with_capacity((samples.len() as f64 * out_rate / in_rate) as usize + RESAMPLE_CHUNK_SIZE);

    let mut pos = 0;
    while samples.len() - pos >= resampler.input_frames_next() {
        let frames = resampler.input_frames_next();
        let out = resampler.process(&[&samples[pos..pos + frames]], None)?;
        resampled.extend_from_slice(&out[0]);
        pos += frames;
    }
    if pos < samples.len() {
        let tail: [&[f32]; 1] = [&samples[pos..]];
        let out = resampler.process_partial(Some(&tail[..]), None)?;
        resampled.extend_from_slice(&out[0]);
    }
    Ok(resampled)
}

/// Decodes little-endian PCM16 bytes into f32 samples in [-1.0, 1.0].
/// A trailing odd byte is ignored.
pub fn decode_pcm16_le(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(2)
        .map(|chunk| {
            let v = i16::from_le_bytes([chunk[0], chunk[1]]);
            (v as f32 / 32768.0).clamp(-1.0, 1.0)
        })
        .collect()
}

/// Converts a slice of f32 samples to a vector of i16 samples.
pub fn convert_f32_to_i16(pcm32: &[f32]) -> Vec<i16> {
    pcm32
        .iter()
        .map(|&sample| (sample * i16::MAX as f32).clamp(i16::MIN as f32, i16::MAX as f32) as i16)
        .collect()
}

/// Averages interleaved frames down to one channel.
pub fn downmix_to_mono(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }
    interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// Wraps mono f32 samples in a 16-bit PCM WAV container.
pub fn encode_wav_mono16(samples: &[f32], sample_rate: u32) -> Vec<u8> {
    const HEADER_LEN: usize = 44;
    let pcm = convert_f32_to_i16(samples);
    let data_len = (pcm.len() * 2) as u32;
    let byte_rate = sample_rate * 2;

    let mut wav = Vec::with_capacity(HEADER_LEN + data_len as usize);
    wav.extend_from_slice(b"RIFF");
    wav.extend_from_slice(&(36 + data_len).to_le_bytes());
    wav.extend_from_slice(b"WAVE");
    wav.extend_from_slice(b"fmt ");
    wav.extend_from_slice(&16u32.to_le_bytes());
    wav.extend_from_slice(&1u16.to_le_bytes()); // PCM
    wav.extend_from_slice(&1u16.to_le_bytes()); // mono
    wav.extend_from_slice(&sample_rate.to_le_bytes());
    wav.extend_from_slice(&byte_rate.to_le_bytes());
    wav.extend_from_slice(&2u16.to_le_bytes()); // block align
    wav.extend_from_slice(&16u16.to_le_bytes()); // bits per sample
    wav.extend_from_slice(b"data");
    wav.extend_from_slice(&data_len.to_le_bytes());
    for sample in pcm {
        wav.extend_from_slice(&sample.to_le_bytes());
    }
    wav
}
