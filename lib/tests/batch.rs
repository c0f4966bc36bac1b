use deep_dream as dd;
use dd::{Error, LayerSelection};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

struct Dirs {
    root: PathBuf,
    right_in: PathBuf,
    left_in: PathBuf,
    right_out: PathBuf,
    left_out: PathBuf,
}

impl Dirs {
    fn new(name: &str) -> Self {
        let root = std::env::temp_dir().join(format!("deep-dream-{}-{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&root);

        let dirs = Self {
            right_in: root.join("right"),
            left_in: root.join("left"),
            right_out: root.join("out").join("right"),
            left_out: root.join("out").join("left"),
            root,
        };

        std::fs::create_dir_all(&dirs.right_in).unwrap();
        std::fs::create_dir_all(&dirs.left_in).unwrap();
        dirs
    }

    fn batch(&self) -> Result<dd::Batch, Error> {
        dd::Batch::from_dirs(&self.right_in, &self.left_in, &self.right_out, &self.left_out)
    }
}

impl Drop for Dirs {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.root);
    }
}

fn write_png(path: &Path, width: u32, height: u32, seed: u32) {
    dd::image::RgbImage::from_fn(width, height, |x, y| {
        let v = |c: u32| ((x * 29 + y * 13 + c * 41 + seed * 7) % 256) as u8;
        dd::image::Rgb([v(0), v(1), v(2)])
    })
    .save(path)
    .unwrap();
}

fn session(threads: usize) -> dd::Session<dd::FilterBank> {
    dd::Session::builder(dd::FilterBank::new(4))
        .iterations(2)
        .levels(1)
        .tile_size(16)
        .layers(LayerSelection::Fixed(vec![1, 3]))
        .seed(5)
        .max_thread_count(threads)
        .build()
        .unwrap()
}

#[test]
fn pairs_are_matched_by_sorted_name() {
    let dirs = Dirs::new("pairing");
    for (i, name) in ["b.png", "a.png", "c.png"].iter().enumerate() {
        write_png(&dirs.right_in.join(name), 8, 8, i as u32);
    }
    for (i, name) in ["2.png", "1.png"].iter().enumerate() {
        write_png(&dirs.left_in.join(name), 8, 8, i as u32);
    }

    let batch = dirs.batch().unwrap();
    assert_eq!(batch.len(), 2);

    let names: Vec<_> = batch
        .pairs()
        .iter()
        .map(|p| {
            (
                p.right_input.file_name().unwrap().to_owned(),
                p.left_input.file_name().unwrap().to_owned(),
                p.right_output.clone(),
            )
        })
        .collect();

    assert_eq!(names[0].0, "a.png");
    assert_eq!(names[0].1, "1.png");
    assert_eq!(names[0].2, dirs.right_out.join("a.png.jpeg"));
    assert_eq!(names[1].0, "b.png");
    assert_eq!(names[1].1, "2.png");
}

#[test]
fn empty_directories_have_no_images() {
    let dirs = Dirs::new("empty");

    match dirs.batch() {
        Err(Error::NoImages) => {}
        _ => panic!("expected no images"),
    }
}

#[test]
fn run_saves_every_pair() {
    let dirs = Dirs::new("run");
    for i in 0..3 {
        write_png(&dirs.right_in.join(format!("{}.png", i)), 24, 20, i);
        write_png(&dirs.left_in.join(format!("{}.png", i)), 24, 20, i + 10);
    }

    let updates = Arc::new(Mutex::new(Vec::new()));
    let progress = {
        let updates = Arc::clone(&updates);
        move |update: dd::ProgressUpdate<'_>| {
            updates.lock().unwrap().push((
                update.pair,
                update.layer,
                update.octave,
                update.iteration,
            ));
        }
    };

    let batch = dirs.batch().unwrap();
    let reports = session(2).run(&batch, Some(Box::new(progress))).unwrap();

    assert_eq!(reports.len(), 3);
    for (i, report) in reports.iter().enumerate() {
        assert_eq!(report.right, dirs.right_out.join(format!("{}.png.jpeg", i)));
        assert_eq!(report.left, dirs.left_out.join(format!("{}.png.jpeg", i)));
        assert_eq!(report.layers.len(), 2);

        for path in &[&report.right, &report.left] {
            assert_eq!(dd::image::image_dimensions(path).unwrap(), (24, 20));
        }
    }

    // 3 pairs x 2 layers x 2 octaves x 2 iterations
    let updates = updates.lock().unwrap();
    assert_eq!(updates.len(), 24);
    assert!(updates.iter().all(|(pair, layer, octave, iteration)| {
        pair.total == 3 && layer.total == 2 && octave.total == 2 && iteration.total == 2
    }));
}

#[test]
fn thread_count_does_not_change_results() {
    let dirs = Dirs::new("threads");
    for i in 0..4 {
        write_png(&dirs.right_in.join(format!("{}.png", i)), 16, 16, i);
        write_png(&dirs.left_in.join(format!("{}.png", i)), 16, 16, i + 3);
    }

    let batch = dirs.batch().unwrap();
    let read_all = |reports: &[dd::DreamReport]| {
        reports
            .iter()
            .flat_map(|r| vec![std::fs::read(&r.right).unwrap(), std::fs::read(&r.left).unwrap()])
            .collect::<Vec<_>>()
    };

    let single = read_all(&session(1).run(&batch, None).unwrap());
    let multi = read_all(&session(4).run(&batch, None).unwrap());

    assert_eq!(single, multi);
}

#[test]
fn mismatched_pair_fails_the_batch() {
    let dirs = Dirs::new("mismatch");
    write_png(&dirs.right_in.join("0.png"), 16, 16, 0);
    write_png(&dirs.left_in.join("0.png"), 12, 16, 1);

    match session(1).run(&dirs.batch().unwrap(), None) {
        Err(Error::SizeMismatch(_)) => {}
        _ => panic!("expected a size mismatch"),
    }
}
