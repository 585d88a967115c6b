//! PNG chart rendering for analysis output
//!
//! The standard experiment figure: position trace plus fitted velocity line
//! on the left axis, force trace plus mean-force line on the right axis.

use crate::analysis::{mean, LineFit};
use crate::csv_log::LoggedRun;
use crate::error::{Result, RigError};
use plotters::prelude::*;
use std::path::Path;

/// Render the dual-axis position/force chart for one run
pub fn render_run_chart(
    run: &LoggedRun,
    fit: Option<&LineFit>,
    title: &str,
    path: &Path,
) -> Result<()> {
    if run.is_empty() {
        return Err(RigError::InsufficientData("empty run, nothing to plot".into()));
    }

    draw_run_chart(run, fit, title, path).map_err(|e| RigError::Plot(e.to_string()))
}

fn draw_run_chart(
    run: &LoggedRun,
    fit: Option<&LineFit>,
    title: &str,
    path: &Path,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let path_str = path.to_string_lossy();
    let root = BitMapBackend::new(path_str.as_ref(), (1000, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let (t_min, t_max) = padded_range(&run.position_time, 0.02);
    let (p_min, p_max) = padded_range(&run.position, 0.05);
    let (_, f_max) = padded_range(&run.force, 0.05);

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 22).into_font())
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(55)
        .right_y_label_area_size(55)
        .build_cartesian_2d(t_min..t_max, p_min..p_max)?
        .set_secondary_coord(t_min..t_max, 0.0..f_max);

    chart
        .configure_mesh()
        .x_desc("Time (s)")
        .y_desc("Position (mm)")
        .axis_desc_style(("sans-serif", 16))
        .draw()?;

    chart
        .configure_secondary_axes()
        .y_desc("Force (N)")
        .axis_desc_style(("sans-serif", 16))
        .draw()?;

    chart
        .draw_series(LineSeries::new(
            run.position_time
                .iter()
                .zip(run.position.iter())
                .map(|(&t, &p)| (t, p)),
            RED.stroke_width(2),
        ))?
        .label("Position")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 16, y)], RED.stroke_width(2)));

    if let Some(fit) = fit {
        chart
            .draw_series(LineSeries::new(
                [t_min, t_max].iter().map(|&t| (t, fit.value_at(t))),
                RED.stroke_width(1),
            ))?
            .label(format!("Velocity = {:.2} mm/s", fit.slope))
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 16, y)], RED.stroke_width(1)));
    }

    chart
        .draw_secondary_series(LineSeries::new(
            run.force_time
                .iter()
                .zip(run.force.iter())
                .map(|(&t, &f)| (t, f)),
            BLUE.stroke_width(2),
        ))?
        .label("Force")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 16, y)], BLUE.stroke_width(2)));

    let mean_force = mean(&run.force);
    chart
        .draw_secondary_series(LineSeries::new(
            vec![(t_min, mean_force), (t_max, mean_force)],
            BLUE.stroke_width(1),
        ))?
        .label(format!("Average Force = {:.2} N", mean_force))
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 16, y)], BLUE.stroke_width(1)));

    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .position(SeriesLabelPosition::UpperLeft)
        .draw()?;

    root.present()?;
    Ok(())
}

/// Render measured average velocity against normal force, with the waveform
/// model's prediction overlaid
pub fn render_velocity_force_chart(
    measured: &[(f64, f64)],
    theory: &[(f64, f64)],
    path: &Path,
) -> Result<()> {
    if measured.is_empty() {
        return Err(RigError::InsufficientData(
            "no measured points, nothing to plot".into(),
        ));
    }

    draw_velocity_force_chart(measured, theory, path).map_err(|e| RigError::Plot(e.to_string()))
}

fn draw_velocity_force_chart(
    measured: &[(f64, f64)],
    theory: &[(f64, f64)],
    path: &Path,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let path_str = path.to_string_lossy();
    let root = BitMapBackend::new(path_str.as_ref(), (800, 500)).into_drawing_area();
    root.fill(&WHITE)?;

    let forces: Vec<f64> = measured
        .iter()
        .chain(theory.iter())
        .map(|&(f, _)| f)
        .collect();
    let velocities: Vec<f64> = measured
        .iter()
        .chain(theory.iter())
        .map(|&(_, v)| v)
        .collect();

    let (f_min, f_max) = padded_range(&forces, 0.05);
    let (_, v_max) = padded_range(&velocities, 0.1);

    let mut chart = ChartBuilder::on(&root)
        .caption("Average Part Velocity vs Normal Force", ("sans-serif", 20).into_font())
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(55)
        .build_cartesian_2d(f_min..f_max, 0.0..v_max)?;

    chart
        .configure_mesh()
        .x_desc("Normal Force (N)")
        .y_desc("Average Velocity (mm/s)")
        .axis_desc_style(("sans-serif", 16))
        .draw()?;

    chart
        .draw_series(LineSeries::new(measured.iter().copied(), RED.stroke_width(2)))?
        .label("Measured")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 16, y)], RED.stroke_width(2)));
    chart.draw_series(
        measured
            .iter()
            .map(|&(f, v)| Circle::new((f, v), 4, RED.filled())),
    )?;

    if !theory.is_empty() {
        chart
            .draw_series(LineSeries::new(theory.iter().copied(), BLUE.stroke_width(2)))?
            .label("Theoretical")
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 16, y)], BLUE.stroke_width(2)));
    }

    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .position(SeriesLabelPosition::UpperRight)
        .draw()?;

    root.present()?;
    Ok(())
}

/// Min/max of a slice widened by a fractional padding
fn padded_range(data: &[f64], pad: f64) -> (f64, f64) {
    let min = data.iter().copied().fold(f64::INFINITY, f64::min);
    let max = data.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !min.is_finite() || !max.is_finite() {
        return (0.0, 1.0);
    }

    let span = (max - min).max(f64::EPSILON);
    (min - span * pad, max + span * pad)
}
