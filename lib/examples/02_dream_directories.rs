fn main() -> Result<(), deep_dream::Error> {
    //pair up the images of two directories by their sorted file names
    let batch = deep_dream::Batch::from_dirs("imgs/right", "imgs/left", "out/right", "out/left")?;

    //pick 2 to 4 random layers per pair, with a fixed seed
    let session = deep_dream::Session::builder(deep_dream::FilterBank::default())
        .seed(211)
        .build()?;

    //dream every pair, printing which layer is being worked on
    let reports = session.run(
        &batch,
        Some(Box::new(|update: deep_dream::ProgressUpdate<'_>| {
            if update.octave.current == 1 && update.iteration.current == 1 {
                println!(
                    "pair {}/{}: {}",
                    update.pair.current, update.pair.total, update.layer_name
                );
            }
        })),
    )?;

    for report in reports {
        println!("{} {}", report.right.display(), report.left.display());
    }

    Ok(())
}
