use rand::SeedableRng;

fn main() -> Result<(), deep_dream::Error> {
    //create a new session that always optimizes the same two layers
    let session = deep_dream::Session::builder(deep_dream::FilterBank::default())
        .layers(deep_dream::LayerSelection::Fixed(vec![3, 7]))
        .levels(3)
        .build()?;

    //a slightly shifted pair of soft gradients, like two views of the same scene
    let view = |offset: f32| {
        deep_dream::Image::from_shape_fn((192, 256, 3), |(y, x, c)| {
            let fx = (x as f32 + offset) / 256.0;
            let fy = y as f32 / 192.0;
            128.0 + 60.0 * ((fx * 6.0 + c as f32).sin() + (fy * 4.0).cos())
        })
    };
    let right = view(0.0);
    let left = view(8.0);

    //dream both views with the same updates
    let dreamed = session.dream(
        &right,
        &left,
        &mut rand_pcg::Pcg32::seed_from_u64(12),
        |update| {
            if update.step.iteration.current == update.step.iteration.total {
                println!(
                    "{} octave {}/{}",
                    update.layer.name, update.step.octave.current, update.step.octave.total
                );
            }
        },
    )?;

    //save the pair to the disk
    deep_dream::save_image(&dreamed.right, "out/01_right.jpg")?;
    deep_dream::save_image(&dreamed.left, "out/01_left.jpg")
}
