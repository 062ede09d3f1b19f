use crate::convert::{select_converter, select_zeroer};
use crate::{Sample, SampleFormat, StreamFlags, TriangularDither, I24};

fn encode<T: Sample>(values: &[T]) -> Vec<u8> {
    let bytes = T::FORMAT.bytes();
    let mut out = vec![0; values.len() * bytes];

    for (chunk, v) in out.chunks_exact_mut(bytes).zip(values) {
        v.write(chunk);
    }

    out
}

fn decode<T: Sample>(bytes: &[u8]) -> Vec<T> {
    bytes.chunks_exact(T::FORMAT.bytes()).map(T::read).collect()
}

fn convert<S: Sample, D: Sample>(src: &[S], flags: StreamFlags) -> Vec<D> {
    let src = encode(src);
    let frames = src.len() / S::FORMAT.bytes();
    let mut dst = vec![0; frames * D::FORMAT.bytes()];
    let converter = select_converter(S::FORMAT, D::FORMAT, flags);
    converter(&mut dst, 1, &src, 1, frames, &mut TriangularDither::new());
    decode(&dst)
}

const EXACT: StreamFlags = StreamFlags::DITHER_OFF;

#[test]
fn float_to_i16_scales_and_clips() {
    let out: Vec<i16> = convert(&[0.0f32, 0.5, 1.0, -1.0, 2.0, -2.0], EXACT);
    assert_eq!(out, [0, 16383, 32767, -32767, 32767, -32768]);
}

#[test]
fn float_to_i16_without_clip_wraps() {
    let flags = StreamFlags::DITHER_OFF | StreamFlags::CLIP_OFF;
    let out: Vec<i16> = convert(&[2.0f32], flags);
    // 65534 truncated into 16 bits.
    assert_eq!(out, [-2]);
}

#[test]
fn float_to_u8_is_offset() {
    let out: Vec<u8> = convert(&[0.0f32, 1.0, -1.0, -2.0], EXACT);
    assert_eq!(out, [128, 255, 1, 0]);
}

#[test]
fn float_to_i24_uses_full_range() {
    let out: Vec<I24> = convert(&[1.0f32, -1.0, 0.0], EXACT);
    assert_eq!(out[0], I24::MAX);
    assert_eq!(out[1].to_i32(), -0x80_0000);
    assert_eq!(out[2].to_i32(), 0);
}

#[test]
fn float_to_int_dithered_stays_close() {
    let input = [0.25f32, -0.25, 0.0, 0.999];
    let out: Vec<i16> = convert(&input, StreamFlags::NONE);

    for (o, i) in out.iter().zip(input.iter()) {
        let expected = (*i as f64 * 32766.0) as i32;
        assert!((*o as i32 - expected).abs() <= 2, "{} vs {}", o, expected);
    }
}

#[test]
fn int_to_float() {
    let out: Vec<f32> = convert(&[i16::MIN, 0, 16384], EXACT);
    assert_eq!(out, [-1.0, 0.0, 0.5]);

    let out: Vec<f32> = convert(&[0u8, 128, 192], EXACT);
    assert_eq!(out, [-1.0, 0.0, 0.5]);

    let out: Vec<f32> = convert(&[I24::from_i32(0x40_0000)], EXACT);
    assert_eq!(out, [0.5]);
}

#[test]
fn widening_is_exact() {
    let out: Vec<i32> = convert(&[1i16, -1, i16::MAX], StreamFlags::NONE);
    assert_eq!(out, [1 << 16, -1 << 16, (i16::MAX as i32) << 16]);

    let out: Vec<i16> = convert(&[0u8, 128, 255], StreamFlags::NONE);
    assert_eq!(out, [i16::MIN, 0, 127 << 8]);

    let out: Vec<u8> = convert(&[-128i8, 0, 127], StreamFlags::NONE);
    assert_eq!(out, [0, 128, 255]);
}

#[test]
fn narrowing_without_dither_truncates() {
    let out: Vec<i16> = convert(&[0x1234_5678i32, -1], EXACT);
    assert_eq!(out, [0x1234, -1]);

    let out: Vec<i8> = convert(&[I24::from_i32(0x12_3456)], EXACT);
    assert_eq!(out, [0x12]);
}

#[test]
fn narrowing_with_dither_stays_within_one_lsb() {
    let input = [0x1234_5678i32, -0x1234_5678, 0, i32::MAX, i32::MIN];
    let out: Vec<i16> = convert(&input, StreamFlags::NONE);

    for (o, i) in out.iter().zip(input.iter()) {
        let expected = i >> 16;
        assert!((*o as i32 - expected).abs() <= 1, "{} vs {}", o, expected);
    }

    let out: Vec<u8> = convert(&input, StreamFlags::NONE);

    for (o, i) in out.iter().zip(input.iter()) {
        let expected = (i >> 24) + 128;
        assert!((*o as i32 - expected).abs() <= 1, "{} vs {}", o, expected);
    }
}

#[test]
fn packed_24_bit_pairs() {
    let packed = [I24::from_i32(0x12_3456), I24::from_i32(-0x12_3456)];

    let out: Vec<i32> = convert(&packed, EXACT);
    assert_eq!(out, [0x1234_5600, -0x1234_5600]);

    let out: Vec<i16> = convert(&packed[..1], EXACT);
    assert_eq!(out, [0x1234]);

    let out: Vec<i8> = convert(&packed[..1], EXACT);
    assert_eq!(out, [0x12]);

    let out: Vec<u8> = convert(&packed[..1], EXACT);
    assert_eq!(out, [0x92]);

    let out: Vec<I24> = convert(&packed, StreamFlags::NONE);
    assert_eq!(out, packed);

    let out: Vec<I24> = convert(&[0x1234_5678i32], EXACT);
    assert_eq!(out, [I24::from_i32(0x12_3456)]);

    let out: Vec<I24> = convert(&[0x1234i16], StreamFlags::NONE);
    assert_eq!(out, [I24::from_i32(0x12_3400)]);

    let out: Vec<I24> = convert(&[0x12i8], StreamFlags::NONE);
    assert_eq!(out, [I24::from_i32(0x12_0000)]);

    let out: Vec<I24> = convert(&[0x92u8], StreamFlags::NONE);
    assert_eq!(out, [I24::from_i32(0x12_0000)]);

    let out: Vec<I24> = convert(&[0.5f32], EXACT);
    assert_eq!(out, [I24::from_i32(0x3f_ffff)]);
}

#[test]
fn same_format_copies() {
    let input = [0.1f32, -0.7, 3.0];
    let out: Vec<f32> = convert(&input, StreamFlags::NONE);
    assert_eq!(out, input);
}

#[test]
fn strided_conversion() {
    // Second channel of an interleaved stereo buffer into a sequential run.
    let src = encode(&[1i16, 100, 2, 200, 3, 300]);
    let mut dst = encode(&[0i32; 3]);

    let converter = select_converter(SampleFormat::I16, SampleFormat::I32, StreamFlags::NONE);
    converter(&mut dst, 1, &src[2..], 2, 3, &mut TriangularDither::new());

    assert_eq!(decode::<i32>(&dst), [100 << 16, 200 << 16, 300 << 16]);
}

#[test]
fn short_buffers_stop_early() {
    let src = encode(&[1i16, 2]);
    let mut dst = encode(&[0i16; 4]);

    let converter = select_converter(SampleFormat::I16, SampleFormat::I16, StreamFlags::NONE);
    converter(&mut dst, 1, &src, 1, 4, &mut TriangularDither::new());

    assert_eq!(decode::<i16>(&dst), [1, 2, 0, 0]);
}

#[test]
fn zeroers() {
    let mut buf = encode(&[1.0f32, 1.0, 1.0, 1.0]);
    select_zeroer(SampleFormat::F32)(&mut buf, 2, 2);
    assert_eq!(decode::<f32>(&buf), [0.0, 1.0, 0.0, 1.0]);

    let mut buf = vec![0u8; 3];
    select_zeroer(SampleFormat::U8)(&mut buf, 1, 3);
    assert_eq!(buf, [0x80; 3]);

    let mut buf = vec![0xffu8; 6];
    select_zeroer(SampleFormat::I24)(&mut buf, 1, 2);
    assert_eq!(buf, [0; 6]);
}
