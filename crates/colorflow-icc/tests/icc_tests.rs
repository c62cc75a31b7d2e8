//! ICC filter pulls through a conversion.

use approx::assert_abs_diff_eq;
use colorflow_core::{
    ErrorKind, ImageSource, MemoryImage, OptionValue, Options, PixelLayout, ProfileIdentity,
    SampleType,
};
use colorflow_graph::{Conversion, Engine, EngineConfig};
use colorflow_icc::{ICC_LCMS2, IccIdentity, PROFILE_OUT, Profile, register};
use std::sync::Arc;

fn engine() -> Arc<Engine> {
    let mut engine = Engine::with_builtins(EngineConfig::default());
    register(&mut engine).unwrap();
    engine.shared()
}

fn srgb() -> Arc<dyn ProfileIdentity> {
    IccIdentity::srgb().unwrap().shared()
}

/// One-row image.
fn image(
    layout: PixelLayout,
    data: Vec<u8>,
    profile: Option<Arc<dyn ProfileIdentity>>,
) -> Arc<dyn ImageSource> {
    let width = (data.len() / layout.bytes_per_pixel()) as u32;
    let image = MemoryImage::from_vec(width, 1, layout, data).unwrap();
    match profile {
        Some(profile) => Arc::new(image.with_profile(profile)),
        None => Arc::new(image),
    }
}

fn icc(options: Options) -> [(&'static str, Options); 1] {
    [(ICC_LCMS2, options)]
}

#[test]
fn srgb_to_srgb_is_identity() {
    let source = image(PixelLayout::rgb8(), vec![200, 100, 50, 0, 128, 255], Some(srgb()));
    let options = Options::new().with(PROFILE_OUT, OptionValue::Profile(srgb()));
    let conv = Conversion::chain(engine(), source, &icc(options), None).unwrap();

    let mut ticket = conv.full_ticket().unwrap();
    conv.run_pixels(&mut ticket).unwrap();

    let expected = [200u8, 100, 50, 0, 128, 255];
    for (got, want) in ticket.buffer().as_bytes().iter().zip(expected) {
        assert!((*got as i32 - want as i32).abs() <= 1, "{got} vs {want}");
    }
}

#[test]
fn standard_profile_by_name_linearizes() {
    let layout = PixelLayout::rgb_f32();
    let half = 0.5f32.to_le_bytes();
    let data = [half, half, half].concat();
    let source = image(layout, data, Some(srgb()));
    let options = Options::new().with(PROFILE_OUT, "linear-srgb");
    let conv = Conversion::chain(engine(), source, &icc(options), None).unwrap();

    let mut ticket = conv.full_ticket().unwrap();
    conv.run_pixels(&mut ticket).unwrap();

    let bytes = ticket.buffer().as_bytes();
    for c in 0..3 {
        let v = f32::from_le_bytes(bytes[c * 4..c * 4 + 4].try_into().unwrap());
        assert_abs_diff_eq!(v, 0.214, epsilon = 0.01);
    }
}

#[test]
fn alpha_is_copied_through() {
    let source = image(PixelLayout::rgba8(), vec![10, 20, 30, 77], Some(srgb()));
    let options = Options::new().with(PROFILE_OUT, "srgb");
    let conv = Conversion::chain(engine(), source, &icc(options), None).unwrap();

    let desc = conv.output_desc().unwrap();
    assert_eq!(desc.layout.extra_channels(), 1);

    let mut ticket = conv.full_ticket().unwrap();
    conv.run_pixels(&mut ticket).unwrap();
    assert_eq!(ticket.buffer().as_bytes()[3], 77);
}

#[test]
fn gray_destination_changes_layout() {
    let gray = IccIdentity::new(&Profile::gray(2.2).unwrap()).unwrap().shared();
    let source = image(PixelLayout::rgb8(), vec![255, 255, 255], Some(srgb()));
    let options = Options::new()
        .with(PROFILE_OUT, OptionValue::Profile(gray))
        .with("sample_type", "u16");
    let conv = Conversion::chain(engine(), source, &icc(options), None).unwrap();

    let desc = conv.output_desc().unwrap();
    assert_eq!(desc.layout.color_channels(), 1);
    assert_eq!(desc.layout.sample(), SampleType::U16);

    let mut ticket = conv.full_ticket().unwrap();
    conv.run_pixels(&mut ticket).unwrap();
    let v = u16::from_le_bytes([ticket.buffer().as_bytes()[0], ticket.buffer().as_bytes()[1]]);
    assert!(v > 64_000, "white mapped to {v}");
}

#[test]
fn missing_destination_profile_is_an_option_error() {
    let source = image(PixelLayout::rgb8(), vec![1, 2, 3], Some(srgb()));
    let conv = Conversion::chain(engine(), source, &icc(Options::new()), None).unwrap();

    let err = conv.output_desc().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::IncompatibleOption);
}

#[test]
fn untagged_input_cannot_build_context() {
    let source = image(PixelLayout::rgb8(), vec![1, 2, 3], None);
    let options = Options::new().with(PROFILE_OUT, "srgb");
    let conv = Conversion::chain(engine(), source, &icc(options), None).unwrap();

    let mut ticket = conv.full_ticket().unwrap();
    let err = conv.run_pixels(&mut ticket).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::IncompatibleContext);
    assert!(conv.is_dirty());
}

#[test]
fn bad_intent_is_rejected() {
    let source = image(PixelLayout::rgb8(), vec![1, 2, 3], Some(srgb()));
    let options = Options::new()
        .with(PROFILE_OUT, "srgb")
        .with("rendering_intent", "vivid");
    let conv = Conversion::chain(engine(), source, &icc(options), None).unwrap();

    let mut ticket = conv.full_ticket().unwrap();
    let err = conv.run_pixels(&mut ticket).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::IncompatibleOption);
}

#[test]
fn conversions_share_the_transform() {
    let engine = engine();
    let options = Options::new()
        .with(PROFILE_OUT, "display-p3")
        .with("rendering_intent", "relative")
        .with("black_point_compensation", "1");

    for _ in 0..2 {
        let source = image(PixelLayout::rgb8(), vec![9, 99, 199], Some(srgb()));
        let conv = Conversion::chain(engine.clone(), source, &icc(options.clone()), None).unwrap();
        let mut ticket = conv.full_ticket().unwrap();
        conv.run_pixels(&mut ticket).unwrap();
    }

    let stats = engine.cache().stats();
    assert_eq!(stats.builds, 1);
    assert_eq!(stats.hits, 1);
}

#[test]
fn parallel_rows_match_serial() {
    let width = 16u32;
    let height = 64u32;
    let data: Vec<u8> = (0..width * height * 3).map(|i| (i * 7 % 256) as u8).collect();
    let run = |config: EngineConfig| {
        let mut engine = Engine::with_builtins(config);
        register(&mut engine).unwrap();
        let source = MemoryImage::from_vec(width, height, PixelLayout::rgb8(), data.clone())
            .unwrap()
            .with_profile(srgb());
        let options = Options::new().with(PROFILE_OUT, "display-p3");
        let conv = Conversion::chain(engine.shared(), Arc::new(source), &icc(options), None).unwrap();
        let mut ticket = conv.full_ticket().unwrap();
        conv.run_pixels(&mut ticket).unwrap();
        ticket.into_buffer()
    };

    let parallel = run(EngineConfig {
        parallel_rows: true,
        parallel_min_rows: 1,
        ..EngineConfig::default()
    });
    let serial = run(EngineConfig::sequential());
    assert_eq!(parallel.as_bytes(), serial.as_bytes());
}
