use super::*;

fn frame(origin: &str) -> ImageBuffer {
    ImageBuffer::from_fn(3, 2, origin, |x, y| (y * 3 + x) as f32)
}

#[test]
fn test_shape_is_height_then_width() {
    let f = frame("light");
    assert_eq!(f.shape(), Shape::new(2, 3));
    assert_eq!(f.shape().to_string(), "(2, 3)");
    assert_eq!(f.shape().pixel_count(), 6);
    assert_eq!(f.pixels(), &[0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);
}

#[test]
fn test_derive_appends_suffix_and_keeps_header() {
    let f = frame("light_001").with_header("EXPTIME", 30.0);
    let derived = f.derive("_subdark");
    assert_eq!(derived.origin, "light_001_subdark");
    assert_eq!(derived.header("EXPTIME").and_then(HeaderValue::as_f64), Some(30.0));

    let replaced = f.derive_with(Buffer2::new_filled(3, 2, 7.0), "_norm");
    assert_eq!(replaced.origin, "light_001_norm");
    assert!(replaced.pixels().iter().all(|&v| v == 7.0));
    assert_eq!(f.origin, "light_001");
}

#[test]
fn test_require_header_reports_key_and_origin() {
    let err = frame("flat_01").require_header("BAYERPAT").unwrap_err();
    assert!(matches!(
        err,
        Error::MissingMetadata { ref key, ref origin } if key == "BAYERPAT" && origin == "flat_01"
    ));
}

#[test]
fn test_bayer_pattern_from_header() {
    let f = frame("a").with_header(BAYER_PATTERN_KEY, " rggb ");
    assert_eq!(f.bayer_pattern().unwrap(), BayerPattern::Rggb);

    let f = frame("a").with_header(BAYER_PATTERN_KEY, "XYZW");
    assert!(matches!(f.bayer_pattern(), Err(Error::UnsupportedPattern(ref p)) if p == "XYZW"));

    let f = frame("a").with_header(BAYER_PATTERN_KEY, 3i64);
    assert!(matches!(f.bayer_pattern(), Err(Error::UnsupportedPattern(ref p)) if p == "3"));
}

#[test]
fn test_frame_kind_uses_first_present_type_key() {
    let f = frame("a")
        .with_header("IMAGETYP", "flat")
        .with_header("OBJECT", "dark");
    assert_eq!(f.frame_type_value(), Some("dark"));
    assert_eq!(f.frame_kind(), Some(FrameKind::Dark));

    let f = frame("a").with_header("TARGET", "science");
    assert_eq!(f.frame_kind(), Some(FrameKind::Science));
}

#[test]
fn test_frame_kind_is_case_sensitive() {
    assert_eq!(frame("a").with_header("IMAGETYP", "Dark").frame_kind(), None);
    assert_eq!(frame("a").with_header("IMAGETYP", "Light Frame").frame_kind(), None);
    assert_eq!(frame("a").frame_kind(), None);
}

#[test]
fn test_filter_channel_ignores_case_and_padding() {
    assert_eq!(frame("a").with_header(FILTER_KEY, "r").filter_channel(), Some(Channel::Red));
    assert_eq!(frame("a").with_header(FILTER_KEY, " G ").filter_channel(), Some(Channel::Green));
    assert_eq!(frame("a").with_header(FILTER_KEY, "Blue").filter_channel(), Some(Channel::Blue));
    assert_eq!(frame("a").with_header(FILTER_KEY, "Ha").filter_channel(), None);
    assert_eq!(frame("a").with_header(FILTER_KEY, 1i64).filter_channel(), None);
    assert_eq!(frame("a").filter_channel(), None);
}

#[test]
fn test_frame_set_rejects_empty_and_mismatched() {
    assert!(matches!(FrameSet::new(Vec::new()), Err(Error::EmptyFrameSet)));

    let odd = ImageBuffer::filled(3, 3, 0.0, "odd");
    let err = FrameSet::new(vec![frame("a"), frame("b"), odd]).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("frame 2 ('odd')"), "{msg}");
    assert!(msg.contains("(2, 3)") && msg.contains("(3, 3)"), "{msg}");

    let set = FrameSet::new(vec![frame("a"), frame("b")]).unwrap();
    assert_eq!(set.len(), 2);
    assert_eq!(set.shape(), Shape::new(2, 3));
    assert_eq!(set.first().origin, "a");
    let origins: Vec<String> = set.into_vec().into_iter().map(|f| f.origin).collect();
    assert_eq!(origins, ["a", "b"]);
}

#[test]
fn test_color_triple_requires_one_shape() {
    let err = ColorTriple::new(frame("r"), frame("g"), ImageBuffer::filled(2, 2, 0.0, "b"))
        .unwrap_err();
    assert!(err.to_string().contains("blue plane"), "{err}");

    let triple = ColorTriple::new(frame("r"), frame("g"), frame("b")).unwrap();
    let origins: Vec<(Channel, &str)> = triple
        .iter()
        .map(|(c, plane)| (c, plane.origin.as_str()))
        .collect();
    assert_eq!(
        origins,
        [(Channel::Red, "r"), (Channel::Green, "g"), (Channel::Blue, "b")]
    );
}

#[test]
fn test_channel_suffixes() {
    let suffixes: Vec<&str> = Channel::ALL.iter().map(Channel::suffix).collect();
    assert_eq!(suffixes, ["_r", "_g", "_b"]);
    assert_eq!(Channel::Green.to_string(), "Green");
}
