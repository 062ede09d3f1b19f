use std::sync::{Arc, Mutex};

use pcm_core::{SampleFormat, StatusFlags, StreamFlags};
use rand::{rngs::SmallRng, Rng, SeedableRng};

use crate::processor::{frame_shift, BufferProcessor, ChannelConfig, Flow, HostBufferSizeMode};
use crate::{Error, TimeInfo};

fn to_bytes(samples: &[f32]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_ne_bytes()).collect()
}

fn from_bytes(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|c| f32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

fn mono() -> ChannelConfig {
    ChannelConfig::new(1, SampleFormat::F32, SampleFormat::F32)
}

/// Run a single period over interleaved host buffers.
fn period(
    processor: &mut BufferProcessor,
    input: Option<&[u8]>,
    output: Option<&mut [u8]>,
    frames: usize,
    flow: &mut Flow,
) -> usize {
    let mut period = processor.begin_processing(TimeInfo::default(), StatusFlags::NONE);

    if let Some(input) = input {
        period.set_input_frame_count(frames);
        period.set_interleaved_input_channels(0, input, 0);
    }

    if let Some(output) = output {
        period.set_output_frame_count(frames);
        period.set_interleaved_output_channels(0, output, 0);
    }

    period.end_processing(flow)
}

/// Build a mono duplex processor which copies input to output and records
/// the size of every callback invocation.
fn passthrough(
    user: usize,
    host: usize,
    mode: HostBufferSizeMode,
) -> crate::Result<(BufferProcessor, Arc<Mutex<Vec<usize>>>)> {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let recorded = calls.clone();

    let processor = BufferProcessor::builder()
        .input(mono())
        .output(mono())
        .frames_per_user_buffer(user)
        .frames_per_host_buffer(host)
        .host_buffer_size_mode(mode)
        .callback(move |input, output, frames, _, _| {
            recorded.lock().unwrap().push(frames);

            if let (Some(input), Some(output)) = (input, output) {
                output.as_bytes_mut().copy_from_slice(input.as_bytes());
            }

            Flow::Continue
        })
        .build()?;

    Ok((processor, calls))
}

/// Feed a ramp through a passthrough processor one period at a time and
/// check that output is the input delayed by the reported latency.
fn assert_delayed(processor: &mut BufferProcessor, sizes: &[usize]) {
    let periods = sizes.iter().map(|&n| (n, n, n)).collect::<Vec<_>>();
    assert_delayed_split(processor, &periods);
}

/// Like [assert_delayed], but every period is registered as two host
/// fragments. Each entry is the size of the period followed by the size of
/// the first input and the first output fragment, neither of which may be
/// zero.
fn assert_delayed_split(processor: &mut BufferProcessor, periods: &[(usize, usize, usize)]) {
    let latency = processor.input_latency_frames() + processor.output_latency_frames();
    let mut next = 0;
    let mut out = Vec::new();

    for &(frames, first_input, first_output) in periods {
        let input = to_bytes(&(next..next + frames).map(|n| (n + 1) as f32).collect::<Vec<_>>());
        let mut output = vec![0xffu8; frames * 4];

        {
            let (input_a, input_b) = input.split_at(first_input * 4);
            let (output_a, output_b) = output.split_at_mut(first_output * 4);

            let mut period = processor.begin_processing(TimeInfo::default(), StatusFlags::NONE);
            period.set_input_frame_count(first_input);
            period.set_interleaved_input_channels(0, input_a, 0);
            period.set_output_frame_count(first_output);
            period.set_interleaved_output_channels(0, output_a, 0);

            if !input_b.is_empty() {
                period.set_second_input_frame_count(frames - first_input);
                period.set_second_interleaved_input_channels(0, input_b, 0);
            }

            if !output_b.is_empty() {
                period.set_second_output_frame_count(frames - first_output);
                period.set_second_interleaved_output_channels(0, output_b, 0);
            }

            assert_eq!(period.end_processing(&mut Flow::Continue), frames);
        }

        out.extend(from_bytes(&output));
        next += frames;
    }

    for (n, s) in out.iter().enumerate() {
        let expected = if n >= latency {
            (n - latency + 1) as f32
        } else {
            0.0
        };

        assert_eq!(*s, expected, "frame {}", n);
    }
}

#[test]
fn test_frame_shift() {
    assert_eq!(frame_shift(160, 100), 80);
    assert_eq!(frame_shift(100, 160), 140);
    assert_eq!(frame_shift(256, 100), 96);
    assert_eq!(frame_shift(48, 20), 16);
    assert_eq!(frame_shift(1024, 256), 0);
}

#[test]
fn multiple_of_user_buffer_does_not_adapt() -> crate::Result<()> {
    let (mut processor, calls) = passthrough(256, 1024, HostBufferSizeMode::Fixed)?;

    assert!(!processor.is_adapting());
    assert_eq!(processor.frames_per_temp_buffer(), 256);
    processor.reset();
    assert_eq!(processor.input_latency_frames(), 0);
    assert_eq!(processor.output_latency_frames(), 0);

    let input = to_bytes(&(0..1024).map(|n| n as f32).collect::<Vec<_>>());
    let mut output = vec![0u8; 1024 * 4];
    let mut flow = Flow::Continue;

    let processed = period(&mut processor, Some(&input), Some(&mut output), 0, &mut flow);

    assert_eq!(processed, 1024);
    assert_eq!(*calls.lock().unwrap(), vec![256; 4]);
    assert_eq!(output, input);
    Ok(())
}

#[test]
fn unspecified_user_buffer_uses_host_size() -> crate::Result<()> {
    let (mut processor, calls) = passthrough(0, 480, HostBufferSizeMode::Bounded)?;

    assert!(!processor.is_adapting());
    assert_eq!(processor.frames_per_temp_buffer(), 480);

    let input = to_bytes(&[0.5; 300]);
    let mut output = vec![0u8; 300 * 4];
    period(&mut processor, Some(&input), Some(&mut output), 300, &mut Flow::Continue);

    assert_eq!(*calls.lock().unwrap(), vec![300]);
    assert_eq!(output, input);

    let (processor, _) = passthrough(0, 480, HostBufferSizeMode::Unknown)?;
    assert_eq!(processor.frames_per_temp_buffer(), 1024);
    Ok(())
}

#[test]
fn adapting_seeds_output_latency() -> crate::Result<()> {
    let (mut processor, calls) = passthrough(100, 160, HostBufferSizeMode::Fixed)?;

    assert!(processor.is_adapting());
    assert_eq!(processor.input_latency_frames(), 0);
    assert_eq!(processor.output_latency_frames(), 80);
    assert!(!processor.is_output_empty());

    assert_delayed(&mut processor, &[160; 10]);
    assert_eq!(calls.lock().unwrap().iter().sum::<usize>(), 1600);
    assert!(calls.lock().unwrap().iter().all(|&n| n == 100));

    processor.reset();
    assert_eq!(processor.output_latency_frames(), 80);
    assert_delayed(&mut processor, &[160; 5]);
    Ok(())
}

#[test]
fn adapting_seeds_input_latency() -> crate::Result<()> {
    let (mut processor, _) = passthrough(160, 100, HostBufferSizeMode::Fixed)?;

    assert_eq!(processor.input_latency_frames(), 140);
    assert_eq!(processor.output_latency_frames(), 0);
    assert_delayed(&mut processor, &[100; 10]);
    Ok(())
}

#[test]
fn variable_host_periods() -> crate::Result<()> {
    let mut rng = SmallRng::seed_from_u64(0x5eed);
    let sizes = (0..64).map(|_| rng.gen_range(1..=300)).collect::<Vec<usize>>();

    for mode in [HostBufferSizeMode::Bounded, HostBufferSizeMode::Unknown] {
        let (mut processor, calls) = passthrough(64, 300, mode)?;
        assert_eq!(processor.output_latency_frames(), 64);
        assert_delayed(&mut processor, &sizes);
        assert!(calls.lock().unwrap().iter().all(|&n| n == 64));
    }

    Ok(())
}

#[test]
fn partial_usage_leaves_short_input() -> crate::Result<()> {
    let (mut processor, calls) =
        passthrough(64, 0, HostBufferSizeMode::VariablePartialUsageAllowed)?;

    let input = to_bytes(&[0.25; 100]);
    let mut output = vec![0u8; 100 * 4];

    let processed = period(&mut processor, Some(&input), Some(&mut output), 100, &mut Flow::Continue);

    assert_eq!(processed, 64);
    assert_eq!(*calls.lock().unwrap(), vec![64]);
    Ok(())
}

#[test]
fn abort_silences_rest_of_period() -> crate::Result<()> {
    let calls = Arc::new(Mutex::new(0));
    let recorded = calls.clone();

    let mut processor = BufferProcessor::builder()
        .input(mono())
        .output(mono())
        .frames_per_user_buffer(100)
        .frames_per_host_buffer(160)
        .callback(move |_, output, _, _, _| {
            *recorded.lock().unwrap() += 1;

            if let Some(output) = output.and_then(|o| o.interleaved_mut::<f32>()) {
                output.fill(1.0);
            }

            Flow::Abort
        })
        .build()?;

    let input = to_bytes(&[0.5; 160]);
    let mut output = to_bytes(&[9.0; 160]);
    let mut flow = Flow::Continue;

    assert_eq!(period(&mut processor, Some(&input), Some(&mut output), 0, &mut flow), 160);

    assert_eq!(flow, Flow::Abort);
    assert_eq!(*calls.lock().unwrap(), 1);
    assert!(processor.is_output_empty());
    assert!(from_bytes(&output).iter().all(|s| *s == 0.0));
    Ok(())
}

#[test]
fn abort_without_adapting() -> crate::Result<()> {
    let mut remaining = 2;

    let mut processor = BufferProcessor::builder()
        .output(mono())
        .frames_per_user_buffer(64)
        .frames_per_host_buffer(256)
        .callback(move |_, output, _, _, _| {
            if let Some(output) = output.and_then(|o| o.interleaved_mut::<f32>()) {
                output.fill(1.0);
            }

            remaining -= 1;

            if remaining == 0 {
                Flow::Abort
            } else {
                Flow::Continue
            }
        })
        .build()?;

    let mut output = to_bytes(&[9.0; 256]);
    let mut flow = Flow::Continue;

    assert_eq!(period(&mut processor, None, Some(&mut output), 0, &mut flow), 256);

    let output = from_bytes(&output);
    assert!(output[..64].iter().all(|s| *s == 1.0));
    assert!(output[64..].iter().all(|s| *s == 0.0));
    Ok(())
}

#[test]
fn complete_drains_buffered_output() -> crate::Result<()> {
    let calls = Arc::new(Mutex::new(0));
    let recorded = calls.clone();

    let mut processor = BufferProcessor::builder()
        .input(mono())
        .output(mono())
        .frames_per_user_buffer(100)
        .frames_per_host_buffer(160)
        .callback(move |_, output, _, _, _| {
            *recorded.lock().unwrap() += 1;

            if let Some(output) = output.and_then(|o| o.interleaved_mut::<f32>()) {
                output.fill(1.0);
            }

            Flow::Complete
        })
        .build()?;

    let input = to_bytes(&[0.5; 160]);
    let mut flow = Flow::Continue;

    let mut output = to_bytes(&[9.0; 160]);
    period(&mut processor, Some(&input), Some(&mut output), 0, &mut flow);
    let output = from_bytes(&output);

    assert_eq!(flow, Flow::Complete);
    assert!(output[..80].iter().all(|s| *s == 0.0));
    assert!(output[80..].iter().all(|s| *s == 1.0));
    assert!(!processor.is_output_empty());

    let mut output = to_bytes(&[9.0; 160]);
    period(&mut processor, Some(&input), Some(&mut output), 0, &mut flow);
    let output = from_bytes(&output);

    assert!(output[..20].iter().all(|s| *s == 1.0));
    assert!(output[20..].iter().all(|s| *s == 0.0));
    assert!(processor.is_output_empty());

    for _ in 0..3 {
        let mut output = to_bytes(&[9.0; 160]);
        period(&mut processor, Some(&input), Some(&mut output), 0, &mut flow);
        assert!(from_bytes(&output).iter().all(|s| *s == 0.0));
        assert!(processor.is_output_empty());
    }

    assert_eq!(*calls.lock().unwrap(), 1);
    Ok(())
}

#[test]
fn complete_in_output_only_stream() -> crate::Result<()> {
    let mut processor = BufferProcessor::builder()
        .output(mono())
        .frames_per_user_buffer(100)
        .frames_per_host_buffer(160)
        .callback(|_, output, frames, _, _| {
            if let Some(output) = output.and_then(|o| o.interleaved_mut::<f32>()) {
                assert_eq!(output.len(), frames);
                output.fill(1.0);
            }

            Flow::Complete
        })
        .build()?;

    assert_eq!(processor.output_latency_frames(), 0);

    let mut output = to_bytes(&[9.0; 160]);
    let mut flow = Flow::Continue;
    period(&mut processor, None, Some(&mut output), 0, &mut flow);

    let output = from_bytes(&output);
    assert!(output[..100].iter().all(|s| *s == 1.0));
    assert!(output[100..].iter().all(|s| *s == 0.0));
    assert!(processor.is_output_empty());
    Ok(())
}

#[test]
fn input_only_accumulates_user_buffers() -> crate::Result<()> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let recorded = seen.clone();

    let mut processor = BufferProcessor::builder()
        .input(mono())
        .frames_per_user_buffer(100)
        .frames_per_host_buffer(64)
        .callback(move |input, output, _, time, _| {
            assert!(output.is_none());
            assert_eq!(time.output_buffer_dac_time, 0.0);

            if let Some(input) = input.and_then(|i| i.interleaved::<f32>()) {
                recorded.lock().unwrap().extend_from_slice(input);
            }

            Flow::Continue
        })
        .build()?;

    assert!(processor.is_adapting());
    assert_eq!(processor.input_latency_frames(), 0);

    for p in 0..5 {
        let input = to_bytes(&(0..64).map(|n| (p * 64 + n) as f32).collect::<Vec<_>>());
        assert_eq!(period(&mut processor, Some(&input), None, 0, &mut Flow::Continue), 64);
    }

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 300);
    assert!(seen.iter().enumerate().all(|(n, s)| *s == n as f32));
    Ok(())
}

#[test]
fn never_drop_input_validation() {
    let callback = |_: Option<&crate::InputBuffer<'_>>,
                    _: Option<&mut crate::OutputBuffer<'_>>,
                    _: usize,
                    _: &TimeInfo,
                    _: StatusFlags| Flow::Continue;

    let result = BufferProcessor::builder()
        .output(mono())
        .flags(StreamFlags::NEVER_DROP_INPUT)
        .callback(callback)
        .build();
    assert!(matches!(result, Err(Error::InvalidFlag)));

    let result = BufferProcessor::builder()
        .input(mono())
        .output(mono())
        .frames_per_user_buffer(64)
        .flags(StreamFlags::NEVER_DROP_INPUT)
        .callback(callback)
        .build();
    assert!(matches!(result, Err(Error::InvalidFlag)));

    let result = BufferProcessor::builder()
        .input(mono())
        .output(mono())
        .flags(StreamFlags::NEVER_DROP_INPUT)
        .build();
    assert!(matches!(result, Err(Error::InvalidFlag)));

    let result = BufferProcessor::builder()
        .input(mono())
        .output(mono())
        .flags(StreamFlags::NEVER_DROP_INPUT)
        .callback(callback)
        .build();
    assert!(result.is_ok());
}

#[test]
fn configuration_validation() {
    let result = BufferProcessor::builder().build();
    assert!(matches!(result, Err(Error::InvalidChannelCount)));

    let result = BufferProcessor::builder()
        .input(ChannelConfig::new(0, SampleFormat::F32, SampleFormat::F32))
        .build();
    assert!(matches!(result, Err(Error::InvalidChannelCount)));

    let result = BufferProcessor::builder()
        .output(mono())
        .sample_rate(0.0)
        .build();
    assert!(matches!(result, Err(Error::InvalidSampleRate(_))));

    let result = BufferProcessor::builder()
        .output(mono())
        .frames_per_host_buffer(0)
        .build();
    assert!(matches!(result, Err(Error::InvalidFramesPerBuffer)));

    let result = BufferProcessor::builder()
        .output(mono())
        .frames_per_host_buffer(0)
        .host_buffer_size_mode(HostBufferSizeMode::Unknown)
        .build();
    assert!(result.is_ok());
}

#[test]
fn blocking_copies() -> crate::Result<()> {
    let mut processor = BufferProcessor::builder()
        .input(ChannelConfig::new(2, SampleFormat::F32, SampleFormat::I16))
        .output(ChannelConfig::new(2, SampleFormat::F32, SampleFormat::I16))
        .flags(StreamFlags::DITHER_OFF)
        .frames_per_host_buffer(2)
        .build()?;

    let input = [16384i16, -16384, 0, 8192]
        .iter()
        .flat_map(|s| s.to_ne_bytes())
        .collect::<Vec<_>>();
    let mut output = vec![0xffu8; 8];

    let mut period = processor.begin_processing(TimeInfo::default(), StatusFlags::NONE);
    period.set_input_frame_count(0);
    period.set_interleaved_input_channels(0, &input, 0);
    period.set_output_frame_count(0);
    period.set_interleaved_output_channels(0, &mut output, 0);

    let mut user = vec![0u8; 3 * 2 * 4];
    assert_eq!(period.copy_input(&mut user, 3), 2);
    assert_eq!(&from_bytes(&user)[..4], &[0.5, -0.5, 0.0, 0.25]);
    assert_eq!(period.copy_input(&mut user, 3), 0);

    let user = to_bytes(&[0.5, -0.5]);
    assert_eq!(period.copy_output(&user, 1), 1);
    assert_eq!(period.zero_output(4), 1);
    assert_eq!(period.zero_output(4), 0);
    drop(period);

    let output = output
        .chunks_exact(2)
        .map(|c| i16::from_ne_bytes([c[0], c[1]]))
        .collect::<Vec<_>>();
    assert_eq!(output, [16383, -16383, 0, 0]);
    Ok(())
}

#[test]
fn blocking_copies_sequential() -> crate::Result<()> {
    let mut processor = BufferProcessor::builder()
        .input(ChannelConfig::new(2, SampleFormat::F32, SampleFormat::F32).sequential())
        .frames_per_host_buffer(3)
        .build()?;

    let input = to_bytes(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);

    let mut period = processor.begin_processing(TimeInfo::default(), StatusFlags::NONE);
    period.set_input_frame_count(0);
    period.set_interleaved_input_channels(0, &input, 0);

    let mut user = vec![0u8; 3 * 2 * 4];
    assert_eq!(period.copy_input(&mut user, 3), 3);
    assert_eq!(from_bytes(&user), [1.0, 3.0, 5.0, 2.0, 4.0, 6.0]);
    Ok(())
}

#[test]
fn blocking_copies_sequential_across_periods() -> crate::Result<()> {
    let config = ChannelConfig::new(2, SampleFormat::F32, SampleFormat::F32).sequential();

    let mut processor = BufferProcessor::builder()
        .input(config)
        .output(config)
        .frames_per_host_buffer(2)
        .build()?;

    let periods = [
        to_bytes(&[1.0, 10.0, 2.0, 20.0]),
        to_bytes(&[3.0, 30.0, 4.0, 40.0]),
    ];

    let mut user = vec![0u8; 4 * 2 * 4];

    for (n, input) in periods.iter().enumerate() {
        let mut period = processor.begin_processing(TimeInfo::default(), StatusFlags::NONE);
        period.set_input_frame_count(0);
        period.set_interleaved_input_channels(0, input, 0);
        assert_eq!(period.copy_input_at(&mut user, 4, n * 2, 4), 2);
    }

    assert_eq!(
        from_bytes(&user),
        [1.0, 2.0, 3.0, 4.0, 10.0, 20.0, 30.0, 40.0]
    );

    let mut hosts = [vec![0u8; 4 * 4], vec![0u8; 4 * 4]];

    for (n, output) in hosts.iter_mut().enumerate() {
        let mut period = processor.begin_processing(TimeInfo::default(), StatusFlags::NONE);
        period.set_output_frame_count(0);
        period.set_interleaved_output_channels(0, output, 0);
        assert_eq!(period.copy_output_at(&user, 4, n * 2, 4), 2);
    }

    assert_eq!(from_bytes(&hosts[0]), [1.0, 10.0, 2.0, 20.0]);
    assert_eq!(from_bytes(&hosts[1]), [3.0, 30.0, 4.0, 40.0]);
    Ok(())
}

#[test]
fn sequential_user_buffers() -> crate::Result<()> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let recorded = seen.clone();

    let config = ChannelConfig::new(2, SampleFormat::F32, SampleFormat::F32).sequential();

    let mut processor = BufferProcessor::builder()
        .input(config)
        .output(config)
        .frames_per_host_buffer(4)
        .callback(move |input, output, _, _, _| {
            if let Some(input) = input {
                assert!(input.interleaved::<f32>().is_none());

                if let Some(channel) = input.channel::<f32>(1) {
                    recorded.lock().unwrap().extend(channel.iter());
                }
            }

            if let Some(output) = output {
                if let Some(mut channel) = output.channel_mut::<f32>(0) {
                    channel.fill(1.0);
                }

                if let Some(mut channel) = output.channel_mut::<f32>(1) {
                    channel.copy_from_slice(&[2.0, 3.0, 4.0, 5.0]);
                }
            }

            Flow::Continue
        })
        .build()?;

    let input = to_bytes(&[0.0, 10.0, 0.0, 11.0, 0.0, 12.0, 0.0, 13.0]);
    let mut output = vec![0u8; 8 * 4];

    period(&mut processor, Some(&input), Some(&mut output), 0, &mut Flow::Continue);

    assert_eq!(*seen.lock().unwrap(), [10.0, 11.0, 12.0, 13.0]);
    assert_eq!(
        from_bytes(&output),
        [1.0, 2.0, 1.0, 3.0, 1.0, 4.0, 1.0, 5.0]
    );
    Ok(())
}

#[test]
fn wrapping_host_buffer() -> crate::Result<()> {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let recorded = calls.clone();
    let mut next = 0.0;

    let mut processor = BufferProcessor::builder()
        .output(mono())
        .frames_per_host_buffer(8)
        .callback(move |_, output, frames, _, _| {
            recorded.lock().unwrap().push(frames);

            if let Some(output) = output.and_then(|o| o.interleaved_mut::<f32>()) {
                for s in output {
                    *s = next;
                    next += 1.0;
                }
            }

            Flow::Continue
        })
        .build()?;

    let mut first = vec![0u8; 5 * 4];
    let mut second = vec![0u8; 3 * 4];

    let mut period = processor.begin_processing(TimeInfo::default(), StatusFlags::NONE);
    period.set_output_frame_count(5);
    period.set_interleaved_output_channels(0, &mut first, 0);
    period.set_second_output_frame_count(3);
    period.set_second_interleaved_output_channels(0, &mut second, 0);
    assert_eq!(period.end_processing(&mut Flow::Continue), 8);

    assert_eq!(*calls.lock().unwrap(), [5, 3]);
    assert_eq!(from_bytes(&first), [0.0, 1.0, 2.0, 3.0, 4.0]);
    assert_eq!(from_bytes(&second), [5.0, 6.0, 7.0]);
    Ok(())
}

#[test]
fn duplex_fragments_split_differently() -> crate::Result<()> {
    for user in [0, 8] {
        let (mut processor, calls) = passthrough(user, 8, HostBufferSizeMode::Fixed)?;
        assert!(!processor.is_adapting());

        let input = to_bytes(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);
        let mut output = vec![0xffu8; 8 * 4];

        {
            let (input_a, input_b) = input.split_at(3 * 4);
            let (output_a, output_b) = output.split_at_mut(5 * 4);

            let mut period = processor.begin_processing(TimeInfo::default(), StatusFlags::NONE);
            period.set_input_frame_count(3);
            period.set_interleaved_input_channels(0, input_a, 0);
            period.set_second_input_frame_count(5);
            period.set_second_interleaved_input_channels(0, input_b, 0);
            period.set_output_frame_count(5);
            period.set_interleaved_output_channels(0, output_a, 0);
            period.set_second_output_frame_count(3);
            period.set_second_interleaved_output_channels(0, output_b, 0);
            assert_eq!(period.end_processing(&mut Flow::Continue), 8);
        }

        assert_eq!(output, input, "user buffer of {}", user);

        assert_eq!(*calls.lock().unwrap(), [3, 2, 3]);
    }

    Ok(())
}

#[test]
fn adapting_duplex_fragments_split_differently() -> crate::Result<()> {
    let (mut processor, calls) = passthrough(100, 160, HostBufferSizeMode::Fixed)?;
    assert!(processor.is_adapting());

    assert_delayed_split(
        &mut processor,
        &[
            (160, 100, 30),
            (160, 60, 150),
            (160, 159, 1),
            (160, 1, 159),
            (160, 80, 80),
            (160, 160, 7),
            (160, 13, 160),
            (160, 99, 101),
        ],
    );

    let calls = calls.lock().unwrap();
    assert_eq!(calls.len(), 12);
    assert!(calls.iter().all(|&n| n == 100));
    Ok(())
}

#[test]
fn abort_silences_every_output_channel() -> crate::Result<()> {
    let stereo = ChannelConfig::new(2, SampleFormat::F32, SampleFormat::F32);

    for user in [100, 40] {
        let mut processor = BufferProcessor::builder()
            .input(stereo)
            .output(stereo)
            .frames_per_user_buffer(user)
            .frames_per_host_buffer(160)
            .callback(move |_, output, _, _, _| {
                if let Some(output) = output.and_then(|o| o.interleaved_mut::<f32>()) {
                    output.fill(1.0);
                }

                Flow::Abort
            })
            .build()?;

        let input = to_bytes(&[0.5; 320]);
        let mut output = to_bytes(&[9.0; 320]);
        let mut flow = Flow::Continue;

        assert_eq!(
            period(&mut processor, Some(&input), Some(&mut output), 0, &mut flow),
            160
        );

        assert_eq!(flow, Flow::Abort);
        assert!(processor.is_output_empty());

        for (n, s) in from_bytes(&output).iter().enumerate() {
            assert_eq!(*s, 0.0, "user buffer of {}, sample {} on channel {}", user, n / 2, n % 2);
        }
    }

    Ok(())
}

#[test]
fn missing_input_is_silence() -> crate::Result<()> {
    let (mut processor, calls) = passthrough(100, 160, HostBufferSizeMode::Fixed)?;

    let mut output = to_bytes(&[9.0; 160]);

    let mut period = processor.begin_processing(TimeInfo::default(), StatusFlags::PRIMING_OUTPUT);
    period.set_no_input();
    period.set_output_frame_count(0);
    period.set_interleaved_output_channels(0, &mut output, 0);
    assert_eq!(period.end_processing(&mut Flow::Continue), 160);

    assert_eq!(*calls.lock().unwrap(), [100]);
    assert!(from_bytes(&output).iter().all(|s| *s == 0.0));
    Ok(())
}

#[test]
fn missing_output_is_discarded() -> crate::Result<()> {
    let (mut processor, calls) = passthrough(0, 64, HostBufferSizeMode::Fixed)?;

    let input = to_bytes(&[0.5; 64]);

    let mut period = processor.begin_processing(TimeInfo::default(), StatusFlags::NONE);
    period.set_input_frame_count(0);
    period.set_interleaved_input_channels(0, &input, 0);
    period.set_no_output();
    assert_eq!(period.end_processing(&mut Flow::Continue), 64);

    assert_eq!(*calls.lock().unwrap(), [64]);
    Ok(())
}

#[test]
fn time_info_accounts_for_latency() -> crate::Result<()> {
    let times = Arc::new(Mutex::new(Vec::new()));
    let recorded = times.clone();

    let mut processor = BufferProcessor::builder()
        .input(mono())
        .output(mono())
        .sample_rate(100.0)
        .frames_per_user_buffer(100)
        .frames_per_host_buffer(160)
        .callback(move |_, _, _, time, _| {
            recorded.lock().unwrap().push(*time);
            Flow::Continue
        })
        .build()?;

    let input = to_bytes(&[0.0; 160]);
    let mut output = vec![0u8; 160 * 4];

    let mut period = processor.begin_processing(
        TimeInfo {
            input_buffer_adc_time: 10.0,
            current_time: 5.0,
            output_buffer_dac_time: 20.0,
        },
        StatusFlags::NONE,
    );

    assert!((period.time().output_buffer_dac_time - 20.8).abs() < 1e-9);
    assert_eq!(period.time().current_time, 0.0);

    period.set_input_frame_count(0);
    period.set_interleaved_input_channels(0, &input, 0);
    period.set_output_frame_count(0);
    period.set_interleaved_output_channels(0, &mut output, 0);
    period.end_processing(&mut Flow::Continue);

    let times = times.lock().unwrap();
    assert_eq!(times.len(), 1);
    assert_eq!(times[0].input_buffer_adc_time, 10.0);
    assert!((times[0].output_buffer_dac_time - 20.8).abs() < 1e-9);
    Ok(())
}

#[test]
#[should_panic]
fn registering_missing_direction_panics() {
    let mut processor = BufferProcessor::builder()
        .output(mono())
        .build()
        .unwrap();

    let input = [0u8; 4];
    let mut period = processor.begin_processing(TimeInfo::default(), StatusFlags::NONE);
    period.set_input_channel(0, &input, 1);
}

#[test]
#[should_panic]
fn registering_channel_out_of_range_panics() {
    let mut processor = BufferProcessor::builder()
        .output(mono())
        .build()
        .unwrap();

    let mut output = [0u8; 4];
    let mut period = processor.begin_processing(TimeInfo::default(), StatusFlags::NONE);
    period.set_output_channel(1, &mut output, 1);
}
