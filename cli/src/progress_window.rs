use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

pub struct ProgressWindow {
    total_pb: ProgressBar,
    stage_pb: ProgressBar,

    stage_len: usize,
    finished_pairs: usize,
    // pairs may run in parallel, the stage bar follows one of them at a time
    followed_pair: Option<usize>,
}

impl ProgressWindow {
    pub fn new(pair_count: usize) -> Self {
        let multi_pb = MultiProgress::new();
        let sty = ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} pairs")
            .progress_chars("##-");

        let total_pb = multi_pb.add(ProgressBar::new(pair_count as u64));
        total_pb.set_style(sty);

        let sty = ProgressStyle::default_bar()
            .template(" {msg} {bar:40.cyan/blue} {percent}%")
            .progress_chars("##-");
        let stage_pb = multi_pb.add(ProgressBar::new(100));
        stage_pb.set_style(sty);

        std::thread::spawn(move || {
            let _ = multi_pb.join();
        });

        Self::with_bars(total_pb, stage_pb)
    }

    fn with_bars(total_pb: ProgressBar, stage_pb: ProgressBar) -> Self {
        Self {
            total_pb,
            stage_pb,
            stage_len: 100,
            finished_pairs: 0,
            followed_pair: None,
        }
    }
}

impl Drop for ProgressWindow {
    fn drop(&mut self) {
        self.total_pb.finish();
        self.stage_pb.finish();
    }
}

impl deep_dream::DreamProgress for ProgressWindow {
    fn update(&mut self, update: deep_dream::ProgressUpdate<'_>) {
        let pair = update.pair.current;
        // the last step of the last octave of the last layer finishes a pair
        let done = update.iteration.current == update.iteration.total
            && update.octave.current == update.octave.total
            && update.layer.current == update.layer.total;

        if done {
            self.finished_pairs += 1;
            self.total_pb.set_position(self.finished_pairs as u64);
        }

        if *self.followed_pair.get_or_insert(pair) != pair {
            return;
        }

        if update.iteration.total != self.stage_len {
            self.stage_len = update.iteration.total;
            self.stage_pb.set_length(self.stage_len as u64);
        }

        if update.iteration.current == 1 {
            self.stage_pb.set_message(&format!(
                "pair {} {} ({}/{}) octave {}/{}",
                pair,
                update.layer_name,
                update.layer.current,
                update.layer.total,
                update.octave.current,
                update.octave.total
            ));
        }

        self.stage_pb.set_position(update.iteration.current as u64);

        if done {
            self.followed_pair = None;
        }
    }
}
