use std::f32::consts::PI;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use pcm_core::SampleFormat;
use pcm_stream::loopback::Loopback;
use pcm_stream::Flow;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let loopback = Loopback::new();
    let peak = Arc::new(AtomicU32::new(0));

    let mut phase = 0.0f32;
    let step = 440.0 * 2.0 * PI / 48000.0;

    let mut stream = loopback
        .configure()
        .rate(48000.0)
        .input_channels(1)
        .output_channels(1)
        .format(SampleFormat::F32)
        .frames_per_buffer(100)
        .frames_per_host_buffer(160)
        .paced(true)
        .callback({
            let peak = peak.clone();

            move |input, output, _, _, _| {
                if let Some(input) = input.and_then(|i| i.interleaved::<f32>()) {
                    let max = input.iter().fold(0.0f32, |m, s| m.max(s.abs()));
                    peak.fetch_max(max.to_bits(), Ordering::Relaxed);
                }

                if let Some(output) = output.and_then(|o| o.interleaved_mut::<f32>()) {
                    for s in output {
                        *s = phase.sin() * 0.5;
                        phase = (phase + step) % (2.0 * PI);
                    }
                }

                Flow::Continue
            }
        })
        .open()?;

    let info = stream.info()?;
    println!("Input latency: {:.4}s", info.input_latency);
    println!("Output latency: {:.4}s", info.output_latency);

    stream.start()?;
    std::thread::sleep(std::time::Duration::from_millis(500));
    stream.stop()?;

    println!("Time: {:.3}s", stream.time()?);
    println!("Peak input: {:.3}", f32::from_bits(peak.load(Ordering::Relaxed)));
    println!("CPU load: {:.5}", stream.cpu_load()?);

    stream.close()?;
    Ok(())
}
