use crate::processor::{invoke, BufferProcessor, Flow, HostBufferSizeMode};

impl BufferProcessor {
    /// Process everything registered for the current period, returning the
    /// number of host frames processed.
    pub(crate) fn process(&mut self, flow: &mut Flow) -> usize {
        if let (Some(input), Some(output)) = (&mut self.input, &mut self.output) {
            if input.absent && !output.absent {
                for (i, o) in input.fragments.iter_mut().zip(output.fragments.iter()) {
                    i.frames = o.frames;
                }
            } else if output.absent && !input.absent {
                for (o, i) in output.fragments.iter_mut().zip(input.fragments.iter()) {
                    o.frames = i.frames;
                }
            }

            debug_assert_eq!(
                input.host_frames(),
                output.host_frames(),
                "host input and output frame counts differ"
            );
        }

        let full_duplex = self.input.is_some() && self.output.is_some();

        match (self.adapting, full_duplex) {
            (false, true) => self.non_adapting_duplex(flow),
            (false, false) => self.non_adapting_simplex(flow),
            (true, true) => self.adapting_duplex(flow),
            (true, false) if self.input.is_some() => self.adapting_input_only(flow),
            (true, false) => self.adapting_output_only(flow),
        }
    }

    fn non_adapting_duplex(&mut self, flow: &mut Flow) -> usize {
        let mut processed = 0;

        loop {
            let step = match (&self.input, &self.output) {
                (Some(input), Some(output)) => {
                    let i = input.current_fragment();
                    let o = output.current_fragment();
                    let frames = usize::min(input.fragments[i].frames, output.fragments[o].frames);
                    (i, o, frames)
                }
                _ => break,
            };

            let (i, o, frames) = step;

            if frames == 0 {
                break;
            }

            processed += self.non_adapting(flow, i, o, frames);
        }

        processed
    }

    fn non_adapting_simplex(&mut self, flow: &mut Flow) -> usize {
        let direction = match self.input.as_ref().or(self.output.as_ref()) {
            Some(direction) => direction,
            None => return 0,
        };

        let first = direction.fragments[0].frames;
        let second = direction.fragments[1].frames;

        let mut processed = self.non_adapting(flow, 0, 0, first);

        if second > 0 {
            processed += self.non_adapting(flow, 1, 1, second);
        }

        processed
    }

    /// Process `frames` frames from the given input and output fragments in
    /// chunks of at most one temp buffer.
    fn non_adapting(
        &mut self,
        flow: &mut Flow,
        input_fragment: usize,
        output_fragment: usize,
        frames: usize,
    ) -> usize {
        let Self {
            input,
            output,
            callback,
            dither,
            time,
            status,
            sample_period,
            frames_per_temp,
            ..
        } = self;

        let mut input_left = frames;
        let mut output_left = frames;

        while output_left > 0 && input_left > 0 && *flow == Flow::Continue {
            let n = usize::min(*frames_per_temp, usize::min(input_left, output_left));

            if let Some(input) = input.as_mut() {
                input.read_host(input_fragment, 0, n, n, dither);
            }

            input_left -= n;

            *flow = invoke(callback, input.as_ref(), output.as_mut(), n, time, *status);

            if *flow == Flow::Abort {
                break;
            }

            time.input_buffer_adc_time += n as f64 * *sample_period;
            time.output_buffer_dac_time += n as f64 * *sample_period;

            if let Some(output) = output.as_mut() {
                output.write_host(output_fragment, 0, n, n, dither);
            }

            output_left -= n;
        }

        if let Some(output) = output.as_mut() {
            if output_left > 0 {
                output.zero_host(output_fragment, output_left);
            }
        }

        if let Some(input) = input.as_mut() {
            if input_left > 0 {
                input.skip_host(input_fragment, input_left);
            }
        }

        frames
    }

    fn adapting_input_only(&mut self, flow: &mut Flow) -> usize {
        let Self {
            input,
            callback,
            dither,
            time,
            status,
            sample_period,
            frames_per_user_buffer: user,
            ..
        } = self;

        let input = match input {
            Some(input) => input,
            None => return 0,
        };

        let user = *user;
        let mut processed = 0;

        while input.host_frames() > 0 {
            let fragment = input.current_fragment();
            let at = input.frames_in_temp;
            let n = usize::min(input.fragments[fragment].frames, user - at);

            input.read_host(fragment, at, user, n, dither);
            input.frames_in_temp += n;

            if input.frames_in_temp == user {
                if *flow == Flow::Continue {
                    time.output_buffer_dac_time = 0.0;
                    *flow = invoke(callback, Some(&*input), None, user, time, *status);
                    time.input_buffer_adc_time += user as f64 * *sample_period;
                }

                input.frames_in_temp = 0;
            }

            processed += n;
        }

        processed
    }

    fn adapting_output_only(&mut self, flow: &mut Flow) -> usize {
        let Self {
            output,
            callback,
            dither,
            time,
            status,
            sample_period,
            frames_per_user_buffer: user,
            ..
        } = self;

        let output = match output {
            Some(output) => output,
            None => return 0,
        };

        let user = *user;
        let processed = output.host_frames();

        while output.host_frames() > 0 {
            if output.frames_in_temp == 0 && *flow == Flow::Continue {
                time.input_buffer_adc_time = 0.0;
                *flow = invoke(callback, None, Some(&mut *output), user, time, *status);

                if *flow != Flow::Abort {
                    time.output_buffer_dac_time += user as f64 * *sample_period;
                    output.frames_in_temp = user;
                }
            }

            if output.frames_in_temp > 0 {
                output.drain_temp(user, dither);
            } else {
                output.zero_remaining_host();
            }
        }

        processed
    }

    fn adapting_duplex(&mut self, flow: &mut Flow) -> usize {
        let Self {
            input,
            output,
            callback,
            dither,
            time,
            status,
            sample_period,
            frames_per_user_buffer: user,
            host_buffer_size_mode,
            ..
        } = self;

        let (input, output) = match (input, output) {
            (Some(input), Some(output)) => (input, output),
            _ => return 0,
        };

        let user = *user;

        let min = if *host_buffer_size_mode == HostBufferSizeMode::VariablePartialUsageAllowed {
            user - 1
        } else {
            0
        };

        let mut available = input.host_frames();
        let mut processed = 0;

        output.drain_temp(user, dither);

        while available > min {
            let progress = (available, output.host_frames());

            if output.frames_in_temp == 0 && *flow != Flow::Continue {
                output.zero_remaining_host();
            }

            while input.frames_in_temp < user && input.host_frames() > 0 {
                let fragment = input.current_fragment();
                let at = input.frames_in_temp;
                let n = usize::min(input.fragments[fragment].frames, user - at);

                input.read_host(fragment, at, user, n, dither);
                input.frames_in_temp += n;
                available -= n;
                processed += n;
            }

            if input.frames_in_temp == user && output.frames_in_temp == 0 {
                if *flow == Flow::Continue {
                    *flow = invoke(
                        callback,
                        Some(&*input),
                        Some(&mut *output),
                        user,
                        time,
                        *status,
                    );

                    time.input_buffer_adc_time += user as f64 * *sample_period;
                    time.output_buffer_dac_time += user as f64 * *sample_period;

                    output.frames_in_temp = if *flow == Flow::Abort { 0 } else { user };
                }

                input.frames_in_temp = 0;
            }

            output.drain_temp(user, dither);

            if progress == (available, output.host_frames()) && input.frames_in_temp == user {
                break;
            }
        }

        if *flow != Flow::Continue && output.frames_in_temp == 0 {
            output.zero_remaining_host();
        }

        processed
    }
}
