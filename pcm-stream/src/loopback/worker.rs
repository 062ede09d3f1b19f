use std::time::Duration;

use pcm_core::StatusFlags;

use crate::loom::sync::atomic::Ordering;
use crate::loom::sync::Arc;
use crate::loom::thread;
use crate::loopback::{Engine, Shared, ABORT, COMPLETE};
use crate::processor::Flow;
use crate::stream::FinishedCallback;
use crate::TimeInfo;

/// Process periods until the callback or the stream asks to stop.
///
/// Returns the engine so that the stream can be started again.
pub(super) fn run(mut engine: Engine, shared: Arc<Shared>, finished: FinishedCallback) -> Engine {
    let config = engine.config;
    let period = config.period();

    let mut flow = Flow::Continue;
    let mut time = 0.0;
    let mut first = true;

    tracing::trace!("loopback worker started");

    loop {
        match shared.request.load(Ordering::Acquire) {
            ABORT => break,
            COMPLETE if flow == Flow::Continue => flow = Flow::Complete,
            _ => (),
        }

        let priming = first && config.prime && config.output_channels > 0;
        first = false;

        let status = if priming {
            StatusFlags::PRIMING_OUTPUT
        } else {
            StatusFlags::NONE
        };

        let info = TimeInfo {
            input_buffer_adc_time: time - period,
            current_time: time,
            output_buffer_dac_time: time + period,
        };

        engine.cpu.begin();

        {
            let (processor, input, output) = engine.split();
            let mut p = processor.begin_processing(info, status);

            if config.input_channels > 0 {
                p.set_input_frame_count(0);

                if priming {
                    p.set_no_input();
                } else {
                    p.set_interleaved_input_channels(0, &*input, 0);
                }
            }

            if config.output_channels > 0 {
                p.set_output_frame_count(0);
                p.set_interleaved_output_channels(0, &mut *output, 0);
            }

            p.end_processing(&mut flow);
        }

        engine.cpu.end(config.frames);
        shared.set_cpu_load(engine.cpu.load());

        time += period;
        shared.set_time(time);

        let (processor, input, output) = engine.split();

        // What was played this period is captured by the next one.
        if config.looped() {
            input.copy_from_slice(output);
        } else {
            input.fill(0);
        }

        if flow != Flow::Continue && (flow == Flow::Abort || processor.is_output_empty()) {
            break;
        }

        if config.paced {
            thread::sleep(Duration::from_secs_f64(period));
        }
    }

    finished.call();
    shared.active.store(false, Ordering::Release);

    tracing::trace!(?flow, "loopback worker finished");
    engine
}
