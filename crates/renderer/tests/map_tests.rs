//! Tests for the map canvas: fills, overlays, colorbars, compositing.

use renderer::color::{ptype_colors, ramp, Color};
use renderer::contour::LineStyle;
use renderer::map::{composite_panels, MapCanvas, ValueScale};
use renderer::streamline::StreamlineConfig;
use renderer::text::TextStyle;
use tiny_skia::Pixmap;
use wrf_common::grid::Grid2;

fn gradient_grid(ny: usize, nx: usize) -> Grid2 {
    let mut g = Grid2::filled(ny, nx, 0.0);
    for j in 0..ny {
        for i in 0..nx {
            g.set(j, i, j as f64 * 2.0 + i as f64);
        }
    }
    g
}

fn colored_fraction(pixmap: &Pixmap) -> f64 {
    let colored = pixmap
        .pixels()
        .iter()
        .filter(|p| p.red() != 255 || p.green() != 255 || p.blue() != 255)
        .count();
    colored as f64 / (pixmap.width() * pixmap.height()) as f64
}

// ============================================================================
// full product smoke test
// ============================================================================

#[test]
fn test_full_map_product_renders() {
    let grid = gradient_grid(30, 40);
    let mut canvas = MapCanvas::new(900, 700, 30, 40).unwrap();
    let scale = ValueScale::Bands {
        min: 0.0,
        max: 100.0,
        step: 5.0,
    };
    canvas.fill_field(&grid, ramp("nipy_spectral").unwrap(), &scale);
    canvas.draw_contours(&grid, &[25.0, 50.0, 75.0], 2, &LineStyle::solid(Color::BLACK, 1.0));
    canvas.draw_colorbar(
        ramp("nipy_spectral").unwrap(),
        &scale,
        &[0.0, 25.0, 50.0, 75.0, 100.0],
        "°F",
    );
    canvas.draw_title(&[
        "2m Temperature",
        "Forecast Hour 12 - Valid 2025-01-15 18:00 UTC",
        "Initialized 2025-01-15 06:00 UTC",
    ]);
    canvas.draw_run_tag("d01 2025-01-15_06_00_00");
    canvas.draw_corner_note("Max: 87.3  Min: 12.4");

    let png = canvas.into_png().unwrap();
    assert_eq!(&png[..4], &[0x89, b'P', b'N', b'G']);
    // A banded spectral fill with overlays compresses to far more than
    // a blank canvas would.
    assert!(png.len() > 1000, "png suspiciously small: {} bytes", png.len());
}

#[test]
fn test_fill_field_coverage() {
    let grid = gradient_grid(30, 40);
    let mut canvas = MapCanvas::new(600, 500, 30, 40).unwrap();
    canvas.fill_field(
        &grid,
        ramp("turbo").unwrap(),
        &ValueScale::Range { min: 0.0, max: 100.0 },
    );
    // Plot area is (600-180) x (500-140) of a 600x500 canvas = 50.4%.
    let frac = colored_fraction(canvas.pixmap());
    assert!(frac > 0.40 && frac < 0.60, "fill fraction {}", frac);
}

#[test]
fn test_nan_regions_stay_white() {
    let mut grid = gradient_grid(30, 40);
    for j in 0..30 {
        for i in 0..10 {
            grid.set(j, i, f64::NAN);
        }
    }
    let mut canvas = MapCanvas::new(600, 500, 30, 40).unwrap();
    canvas.fill_field(
        &grid,
        ramp("turbo").unwrap(),
        &ValueScale::Range { min: 0.0, max: 100.0 },
    );
    // Sample inside the masked west strip.
    let (px, py) = canvas.grid_to_px(4.0, 15.0);
    let p = canvas.pixmap().pixel(px as u32, py as u32).unwrap();
    assert_eq!((p.red(), p.green(), p.blue()), (255, 255, 255));
}

// ============================================================================
// categorical fill
// ============================================================================

#[test]
fn test_ptype_mesh_renders_categories() {
    let mut codes = Grid2::filled(20, 20, 0.0);
    for j in 0..20 {
        for i in 0..5 {
            codes.set(j, i, 2.0); // moderate snow
        }
        for i in 15..20 {
            codes.set(j, i, 11.0); // moderate rain
        }
    }
    let mut canvas = MapCanvas::new(500, 420, 20, 20).unwrap();
    canvas.fill_category(&codes, ptype_colors());
    canvas.draw_category_colorbar(
        ptype_colors(),
        &[
            "None", "--", "Snow", "+", "--", "Ice", "+", "--", "FzRa", "+", "--", "Rain", "+",
        ],
    );

    let (px, py) = canvas.grid_to_px(2.0, 10.0);
    let p = canvas.pixmap().pixel(px as u32, py as u32).unwrap();
    // deepskyblue
    assert_eq!((p.red(), p.green(), p.blue()), (0, 191, 255));

    let (px, py) = canvas.grid_to_px(17.0, 10.0);
    let p = canvas.pixmap().pixel(px as u32, py as u32).unwrap();
    // green
    assert_eq!((p.red(), p.green(), p.blue()), (0, 128, 0));
}

// ============================================================================
// overlays
// ============================================================================

#[test]
fn test_barbs_only_inside_plot_area() {
    let u = Grid2::filled(25, 25, 15.0);
    let v = Grid2::filled(25, 25, -5.0);
    let mut canvas = MapCanvas::new(600, 500, 25, 25).unwrap();
    canvas.draw_barbs(&u, &v, 60.0, 22.0, Color::BLACK, 1.2);

    let w = canvas.pixmap().width() as usize;
    for (idx, p) in canvas.pixmap().pixels().iter().enumerate() {
        if p.red() < 128 {
            let (x, y) = (idx % w, idx / w);
            assert!(
                (40..=560).contains(&x) && (60..=480).contains(&y),
                "barb ink far outside plot area at ({}, {})",
                x,
                y
            );
        }
    }
}

#[test]
fn test_streamlines_render_over_uniform_flow() {
    let u = Grid2::filled(30, 30, 12.0);
    let v = Grid2::filled(30, 30, 0.0);
    let mut canvas = MapCanvas::new(600, 500, 30, 30).unwrap();
    canvas.draw_streamlines(
        &u,
        &v,
        &StreamlineConfig::default(),
        &LineStyle::solid(Color::rgb(30, 30, 30), 1.3),
    );
    let frac = colored_fraction(canvas.pixmap());
    assert!(frac > 0.005, "streamlines missing, colored fraction {}", frac);
}

#[test]
fn test_graticule_labels_edges() {
    // Regular lat/lon rectangle: lat 30..33 N, lon 86..82 W.
    let mut lat = Grid2::filled(25, 25, 0.0);
    let mut lon = Grid2::filled(25, 25, 0.0);
    for j in 0..25 {
        for i in 0..25 {
            lat.set(j, i, 30.0 + 3.0 * j as f64 / 24.0);
            lon.set(j, i, -86.0 + 4.0 * i as f64 / 24.0);
        }
    }
    let mut canvas = MapCanvas::new(700, 560, 25, 25).unwrap();
    canvas.draw_graticule(
        &lat,
        &lon,
        &LineStyle::dashed(Color::rgb(150, 150, 150), 1.0),
        &TextStyle::new(11.0, Color::rgb(80, 80, 80)),
    );
    let frac = colored_fraction(canvas.pixmap());
    assert!(frac > 0.002, "graticule should draw lines and labels");
}

// ============================================================================
// compositing
// ============================================================================

#[test]
fn test_four_panel_layout() {
    let mut panels = Vec::new();
    for code in 0..4u8 {
        let grid = gradient_grid(15, 15);
        let mut canvas = MapCanvas::panel(400, 320, 15, 15).unwrap();
        canvas.fill_field(
            &grid,
            ramp("greens").unwrap(),
            &ValueScale::Range { min: 0.0, max: 50.0 },
        );
        canvas.draw_title(&[match code {
            0 => "Low Clouds",
            1 => "Mid Clouds",
            2 => "High Clouds",
            _ => "Total Cloud Cover",
        }]);
        panels.push(canvas);
    }
    let pixmaps: Vec<&Pixmap> = panels.iter().map(|c| c.pixmap()).collect();
    let combined = composite_panels(&pixmaps, 2).unwrap();
    assert_eq!((combined.width(), combined.height()), (800, 640));

    // Panels composite opaquely; nothing outside stays unpainted.
    let frac = colored_fraction(&combined);
    assert!(frac > 0.2);
}
