#![cfg(feature = "web")]
#![cfg(not(tarpaulin_include))]

use crate::error::{Result, SweeperError};
use crate::table::Table;
use image::{ColorType, ImageEncoder, codecs::png::PngEncoder};
use plotters::prelude::*;

/// Configuration options for chart generation
#[derive(Clone, Debug)]
pub struct ChartOptions {
    /// Title displayed at the top of the chart
    pub title: String,

    /// Width of the chart in pixels
    pub width: u32,

    /// Height of the chart in pixels
    pub height: u32,
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self {
            title: "Numeric Data".to_string(),
            width: 900,
            height: 500,
        }
    }
}

/// One named series of bar heights, one entry per table row
#[derive(Clone, Debug, PartialEq)]
pub struct BarSeries {
    pub name: String,
    pub values: Vec<Option<f64>>,
}

/// Collect the numeric columns of a table as bar series
///
/// Missing cells and infinite values become `None`, so they are drawn as
/// gaps and never stretch the value axis.
///
/// # Arguments
/// * `table` - Table whose numeric columns are collected
///
/// # Returns
/// * `Result<Vec<BarSeries>>` - One series per numeric column, in column order
///
/// # Errors
/// * `Validation` when the table has no numeric column
pub fn numeric_series(table: &Table) -> Result<Vec<BarSeries>> {
    let numeric = table.numeric_columns();
    if numeric.is_empty() {
        return Err(SweeperError::Validation(
            "no numeric columns to chart".to_string(),
        ));
    }

    numeric
        .into_iter()
        .map(|name| {
            let values = table
                .column_values(&name)?
                .into_iter()
                .map(|v| v.as_f64().filter(|x| x.is_finite()))
                .collect();
            Ok(BarSeries { name, values })
        })
        .collect()
}

/// Draw a grouped bar chart of the numeric columns of a table
///
/// Each row gets a group of bars, one bar and colour per numeric column,
/// with a legend naming the columns. Missing and infinite cells leave a gap.
///
/// # Arguments
/// * `table` - Table whose numeric columns are plotted
/// * `options` - Chart size and title
///
/// # Returns
/// * `Result<Vec<u8>>` - PNG image data
pub fn create_bar_chart(table: &Table, options: &ChartOptions) -> Result<Vec<u8>> {
    let series = numeric_series(table)?;
    let (width, height) = (options.width, options.height);
    let mut pixels = vec![0u8; width as usize * height as usize * 3];

    draw_bars(&series, table.shape().0, options, &mut pixels)
        .map_err(|e| SweeperError::Chart(e.to_string()))?;

    let mut png = Vec::new();
    PngEncoder::new(&mut png)
        .write_image(&pixels, width, height, ColorType::Rgb8)
        .map_err(|e| SweeperError::Image(e.to_string()))?;

    Ok(png)
}

fn draw_bars(
    series: &[BarSeries],
    row_count: usize,
    options: &ChartOptions,
    pixels: &mut [u8],
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let root =
        BitMapBackend::with_buffer(pixels, (options.width, options.height)).into_drawing_area();
    root.fill(&WHITE)?;

    let all_values = series.iter().flat_map(|s| s.values.iter().flatten());
    let (min_y, max_y) = all_values.fold((0.0f64, 0.0f64), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let span = if max_y > min_y { max_y - min_y } else { 1.0 };
    let y_range = (min_y - span * 0.05).min(0.0)..max_y + span * 0.05;
    let x_range = -0.5f64..(row_count.max(1) as f64 - 0.5);

    let mut chart = ChartBuilder::on(&root)
        .caption(&options.title, ("sans-serif", 24).into_font())
        .margin(10)
        .x_label_area_size(30)
        .y_label_area_size(50)
        .build_cartesian_2d(x_range, y_range)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc("Row")
        .x_label_formatter(&|x| format!("{:.0}", x))
        .draw()?;

    let group_width = 0.8;
    let bar_width = group_width / series.len() as f64;

    for (i, s) in series.iter().enumerate() {
        let color = Palette99::pick(i).to_rgba();
        let offset = -group_width / 2.0 + bar_width * i as f64;
        chart
            .draw_series(s.values.iter().enumerate().filter_map(|(row, value)| {
                value.map(|v| {
                    let left = row as f64 + offset;
                    Rectangle::new([(left, 0.0), (left + bar_width, v)], color.filled())
                })
            }))?
            .label(s.name.clone())
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled()));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}
