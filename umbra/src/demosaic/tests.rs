use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use strum::IntoEnumIterator;

use super::bilinear::mirror;
use super::*;
use crate::image_buffer::{Shape, BAYER_PATTERN_KEY};
use common::buffer2::Buffer2;
use common::float_ext::FloatExt;

fn random_mosaic(width: usize, height: usize, seed: u64) -> ImageBuffer {
    let mut rng = StdRng::seed_from_u64(seed);
    ImageBuffer::from_fn(width, height, "light_001", |_, _| rng.random_range(0.0f32..1.0))
}

/// Per-pixel nested-loop reference with the same mirrored borders.
fn naive_demosaic(src: &Buffer2<f32>, pattern: BayerPattern) -> [Buffer2<f32>; 3] {
    let (w, h) = (src.width(), src.height());
    let at = |x: isize, y: isize| src[(mirror(x, w), mirror(y, h))];
    let mut planes = [
        Buffer2::new_default(w, h),
        Buffer2::new_default(w, h),
        Buffer2::new_default(w, h),
    ];

    for y in 0..h {
        for x in 0..w {
            let (xi, yi) = (x as isize, y as isize);
            let centre = at(xi, yi);
            let cross = (at(xi - 1, yi) + at(xi + 1, yi) + at(xi, yi - 1) + at(xi, yi + 1)) / 4.0;
            let diagonal = (at(xi - 1, yi - 1)
                + at(xi + 1, yi - 1)
                + at(xi - 1, yi + 1)
                + at(xi + 1, yi + 1))
                / 4.0;
            let horizontal = (at(xi - 1, yi) + at(xi + 1, yi)) / 2.0;
            let vertical = (at(xi, yi - 1) + at(xi, yi + 1)) / 2.0;

            let (r, g, b) = match pattern.color_at(y, x) {
                Channel::Red => (centre, cross, diagonal),
                Channel::Blue => (diagonal, cross, centre),
                Channel::Green if pattern.red_in_row(y) => (horizontal, centre, vertical),
                Channel::Green => (vertical, centre, horizontal),
            };
            planes[0][(x, y)] = r;
            planes[1][(x, y)] = g;
            planes[2][(x, y)] = b;
        }
    }
    planes
}

#[test]
fn test_parse_pattern() {
    assert_eq!("RGGB".parse::<BayerPattern>().unwrap(), BayerPattern::Rggb);
    assert_eq!("bggr".parse::<BayerPattern>().unwrap(), BayerPattern::Bggr);
    assert_eq!(" GRBG ".parse::<BayerPattern>().unwrap(), BayerPattern::Grbg);
    assert_eq!("Gbrg".parse::<BayerPattern>().unwrap(), BayerPattern::Gbrg);
    assert_eq!("TRUE".parse::<BayerPattern>().unwrap(), BayerPattern::Rggb);
    assert!(matches!(
        "XTRANS".parse::<BayerPattern>(),
        Err(Error::UnsupportedPattern(p)) if p == "XTRANS"
    ));
    assert!("".parse::<BayerPattern>().is_err());
}

#[test]
fn test_pattern_display_round_trips() {
    for pattern in BayerPattern::iter() {
        assert_eq!(pattern.to_string().parse::<BayerPattern>().unwrap(), pattern);
    }
}

#[test]
fn test_color_at_matches_layout() {
    assert_eq!(BayerPattern::Rggb.color_at(0, 0), Channel::Red);
    assert_eq!(BayerPattern::Rggb.color_at(1, 1), Channel::Blue);
    assert_eq!(BayerPattern::Grbg.color_at(0, 1), Channel::Red);
    assert_eq!(BayerPattern::Gbrg.color_at(1, 0), Channel::Red);
    assert_eq!(BayerPattern::Bggr.color_at(2, 2), Channel::Blue);
    assert!(BayerPattern::Rggb.red_in_row(0));
    assert!(!BayerPattern::Rggb.red_in_row(1));
    assert!(BayerPattern::Gbrg.red_in_row(1));
}

#[test]
fn test_matches_naive_reference() {
    for pattern in BayerPattern::iter() {
        for &(w, h) in &[(8, 6), (7, 5), (2, 2), (3, 1), (1, 4), (33, 17)] {
            let src = random_mosaic(w, h, (w * 100 + h) as u64);
            let fast = demosaic(&src, pattern);
            let reference = naive_demosaic(&src.data, pattern);

            for (plane, expected) in fast.into_array().iter().zip(&reference) {
                for (i, (a, b)) in plane.pixels().iter().zip(expected.pixels()).enumerate() {
                    assert!(
                        a.approx_eq_eps(*b, 1e-5),
                        "{pattern} {w}x{h} pixel {i}: {a} vs {b}"
                    );
                }
            }
        }
    }
}

/// 4x4 mosaic from a written-out color layout with R = 10, G = 20, B = 30.
fn painted_mosaic(layout: [&str; 4]) -> ImageBuffer {
    let rows: Vec<Vec<f32>> = layout
        .iter()
        .map(|row| {
            row.chars()
                .map(|c| match c {
                    'R' => 10.0,
                    'G' => 20.0,
                    'B' => 30.0,
                    _ => panic!("bad layout {row}"),
                })
                .collect()
        })
        .collect();
    ImageBuffer::from_fn(4, 4, "painted", |x, y| rows[y][x])
}

#[test]
fn test_known_answer_per_pattern() {
    let cases = [
        (BayerPattern::Rggb, ["RGRG", "GBGB", "RGRG", "GBGB"]),
        (BayerPattern::Bggr, ["BGBG", "GRGR", "BGBG", "GRGR"]),
        (BayerPattern::Grbg, ["GRGR", "BGBG", "GRGR", "BGBG"]),
        (BayerPattern::Gbrg, ["GBGB", "RGRG", "GBGB", "RGRG"]),
    ];
    for (pattern, layout) in cases {
        let triple = demosaic(&painted_mosaic(layout), pattern);
        for y in 1..3 {
            for x in 1..3 {
                let got = [
                    triple.red.data[(x, y)],
                    triple.green.data[(x, y)],
                    triple.blue.data[(x, y)],
                ];
                assert_eq!(got, [10.0, 20.0, 30.0], "{pattern} at ({x}, {y})");
            }
        }
    }
}

#[test]
fn test_known_answer_rggb_interior() {
    // R G R G
    // G B G B
    let rows = [
        [4.0, 9.0, 2.0, 7.0],
        [1.0, 8.0, 6.0, 3.0],
        [5.0, 0.0, 11.0, 2.0],
        [7.0, 4.0, 1.0, 6.0],
    ];
    let src = ImageBuffer::from_fn(4, 4, "light", |x, y| rows[y][x]);
    let triple = demosaic(&src, BayerPattern::Rggb);

    // (x, y) -> [r, g, b]
    let expected = [
        ((1, 1), [5.5, 4.0, 8.0]),
        ((2, 1), [6.5, 6.0, 5.5]),
        ((1, 2), [8.0, 0.0, 6.0]),
        ((2, 2), [11.0, 2.25, 5.25]),
    ];
    for ((x, y), rgb) in expected {
        let got = [
            triple.red.data[(x, y)],
            triple.green.data[(x, y)],
            triple.blue.data[(x, y)],
        ];
        for (a, b) in got.iter().zip(rgb) {
            assert!(a.approx_eq_eps(b, 1e-6), "({x}, {y}): {got:?} vs {rgb:?}");
        }
    }
}

#[test]
fn test_native_samples_round_trip() {
    for pattern in BayerPattern::iter() {
        let src = random_mosaic(10, 8, 3);
        let triple = demosaic(&src, pattern);
        for y in 0..8 {
            for x in 0..10 {
                let plane = triple.channel(pattern.color_at(y, x));
                assert_eq!(plane.data[(x, y)], src.data[(x, y)]);
            }
        }
    }
}

#[test]
fn test_constant_source_gives_constant_planes() {
    for pattern in BayerPattern::iter() {
        for &(w, h) in &[(4, 4), (5, 3), (1, 1)] {
            let src = ImageBuffer::filled(w, h, 200.0, "flat");
            let triple = demosaic(&src, pattern);
            for (channel, plane) in triple.iter() {
                assert_eq!(plane.shape(), Shape::new(h, w));
                assert!(
                    plane.pixels().iter().all(|&v| v == 200.0),
                    "{pattern} {channel} not constant"
                );
            }
        }
    }
}

#[test]
fn test_output_origins_and_header() {
    let src = ImageBuffer::filled(4, 4, 1.0, "light_007").with_header("EXPTIME", 30.0);
    let triple = demosaic(&src, BayerPattern::Rggb);
    assert_eq!(triple.red.origin, "light_007_r");
    assert_eq!(triple.green.origin, "light_007_g");
    assert_eq!(triple.blue.origin, "light_007_b");
    assert_eq!(triple.blue.header("EXPTIME").and_then(|v| v.as_f64()), Some(30.0));
}

#[test]
fn test_demosaic_from_header() {
    let src = ImageBuffer::filled(4, 4, 1.0, "light");
    assert!(matches!(
        demosaic_from_header(&src),
        Err(Error::MissingMetadata { key, .. }) if key == BAYER_PATTERN_KEY
    ));

    let src = src.with_header(BAYER_PATTERN_KEY, "QQQQ");
    assert!(matches!(
        demosaic_from_header(&src),
        Err(Error::UnsupportedPattern(_))
    ));

    let src = src.with_header(BAYER_PATTERN_KEY, "bggr");
    let triple = demosaic_from_header(&src).unwrap();
    assert_eq!(triple.shape(), Shape::new(4, 4));
}

#[test]
fn test_empty_source() {
    let src = ImageBuffer::new(Buffer2::new(0, 0, vec![]), "empty");
    let triple = demosaic(&src, BayerPattern::Rggb);
    assert!(triple.red.pixels().is_empty());
}
