//! HTML report generation for experiment visualization.
//!
//! Generate self-contained HTML files with embedded
//! [Plotly.js](https://plotly.com/javascript/) charts for offline
//! inspection of experiment results.
//!
//! # Charts included
//!
//! | Report | Chart | Description |
//! |---|---|---|
//! | `convergence.html` | **Mean convergence** | Mean metric vs generation with a ±1 std band, one chart per tracked metric |
//! | `convergence.html` | **Per-run curves** | Hypervolume of every run |
//! | `heat_map.html` | **Co-association** | Fraction of reductions that clustered each pair of axes |
//! | `heat_map.html` | **Co-association over time** | One frame per reduction generation, with a slider |
//!
//! The output is a single HTML file that can be opened in any browser.
//! An internet connection is needed on first load to fetch `Plotly.js`
//! from a CDN.

use core::fmt::Write as _;
use std::path::Path;

use crate::experiment::{AggregateCurve, ExperimentResult, HeatMap};
use crate::metrics::Metric;

/// Write the convergence report of `result` to `path`.
///
/// # Errors
///
/// Return an I/O error if the file cannot be created or written.
pub fn write_convergence_report(result: &ExperimentResult, path: impl AsRef<Path>) -> std::io::Result<()> {
    std::fs::write(path, convergence_html(result))
}

/// Write a heat map report to `path`.
///
/// # Errors
///
/// Return an I/O error if the file cannot be created or written.
pub fn write_heat_map(heat_map: &HeatMap, title: &str, path: impl AsRef<Path>) -> std::io::Result<()> {
    std::fs::write(path, heat_map_html(heat_map, title))
}

pub(crate) fn convergence_html(result: &ExperimentResult) -> String {
    let mut html = header(
        "Convergence Report",
        &format!("{} &middot; {} runs", escape_html(&result.problem), result.runs.len()),
    );

    for curve in [Some(&result.hypervolume), result.igd.as_ref()].into_iter().flatten() {
        let id = format!("mean_{}", curve.metric.label().to_lowercase());
        let _ = writeln!(
            html,
            "<div class=\"chart\"><div class=\"chart-title\">Mean {label}</div><div id=\"{id}\"></div></div>",
            label = curve.metric.label(),
        );
        write_mean_chart(&mut html, &id, curve);
    }

    html.push_str("<div class=\"chart\"><div class=\"chart-title\">Hypervolume per Run</div><div id=\"runs\"></div></div>\n");
    write_run_curves(&mut html, result);

    html.push_str("</body>\n</html>\n");
    html
}

pub(crate) fn heat_map_html(heat_map: &HeatMap, title: &str) -> String {
    let mut html = header(
        "Objective Clustering",
        &format!("{} &middot; {} reductions", escape_html(title), heat_map.n_reductions),
    );
    let labels: Vec<String> = (0..heat_map.n_axes).map(|i| format!("\"f{i}\"")).collect();
    let labels = labels.join(",");

    html.push_str("<div class=\"chart\"><div class=\"chart-title\">Axis Co-association (all reductions)</div><div id=\"overall\"></div></div>\n");
    let _ = write!(
        html,
        r#"<script>
Plotly.newPlot("overall", [{{
  z: {z:?}, x: [{labels}], y: [{labels}], type: "heatmap",
  zmin: 0, zmax: 1, colorscale: "Viridis"
}}], {{ yaxis: {{ autorange: "reversed" }}, margin: {{ t: 10 }} }}, {{ responsive: true }});
</script>
"#,
        z = heat_map.overall,
    );

    if !heat_map.generations.is_empty() {
        html.push_str("<div class=\"chart\"><div class=\"chart-title\">Co-association by Generation</div><div id=\"frames\"></div></div>\n");
        write_frames(&mut html, heat_map, &labels);
    }

    html.push_str("</body>\n</html>\n");
    html
}

fn header(title: &str, subtitle: &str) -> String {
    let mut html = String::with_capacity(8192);
    let _ = write!(
        html,
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title}</title>
<script src="https://cdn.plot.ly/plotly-2.35.2.min.js"></script>
<style>
  * {{ margin: 0; padding: 0; box-sizing: border-box; }}
  body {{ font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, sans-serif;
         background: #f5f6fa; color: #2c3e50; padding: 24px; }}
  h1 {{ text-align: center; margin-bottom: 8px; font-size: 1.8em; }}
  .subtitle {{ text-align: center; color: #7f8c8d; margin-bottom: 24px; }}
  .chart {{ background: #fff; border-radius: 8px; box-shadow: 0 2px 8px rgba(0,0,0,0.08);
            margin-bottom: 24px; padding: 16px; }}
  .chart-title {{ font-size: 1.1em; font-weight: 600; margin-bottom: 8px; }}
</style>
</head>
<body>
<h1>{title}</h1>
<p class="subtitle">{subtitle}</p>
"#,
    );
    html
}

// ---------------------------------------------------------------------------
// Chart generators
// ---------------------------------------------------------------------------

fn write_mean_chart(html: &mut String, id: &str, curve: &AggregateCurve) {
    let gens: Vec<usize> = curve.points.iter().map(|p| p.generation).collect();
    let means = curve.means();
    let upper: Vec<f64> = curve.points.iter().map(|p| p.mean + p.std).collect();
    let lower: Vec<f64> = curve.points.iter().map(|p| p.mean - p.std).collect();
    let color = match curve.metric {
        Metric::Hypervolume => "#3498db",
        Metric::Igd => "#e67e22",
    };

    let _ = write!(
        html,
        r##"<script>
Plotly.newPlot("{id}", [
  {{ x: {gens:?}, y: {upper:?}, mode: "lines", line: {{ width: 0 }}, showlegend: false, type: "scatter" }},
  {{ x: {gens:?}, y: {lower:?}, mode: "lines", line: {{ width: 0 }}, fill: "tonexty",
     fillcolor: "rgba(127,140,141,0.2)", name: "&plusmn;1 std", type: "scatter" }},
  {{ x: {gens:?}, y: {means:?}, mode: "lines", name: "Mean {label}", type: "scatter",
     line: {{ color: "{color}", width: 2 }} }}
], {{ xaxis: {{ title: "Generation" }}, yaxis: {{ title: "{label}" }},
     margin: {{ t: 10 }}, legend: {{ x: 1, xanchor: "right", y: 0 }} }},
   {{ responsive: true }});
</script>
"##,
        label = curve.metric.label(),
    );
}

fn write_run_curves(html: &mut String, result: &ExperimentResult) {
    let mut traces = String::new();
    for run in &result.runs {
        let Some(curve) = run.curve(Metric::Hypervolume) else {
            continue;
        };
        let gens: Vec<usize> = curve.iter().map(|&(g, _)| g).collect();
        let vals: Vec<f64> = curve.iter().map(|&(_, v)| v).collect();
        let _ = write!(
            traces,
            r#"{{ x: {gens:?}, y: {vals:?}, mode: "lines", name: "Run {index} (seed {seed})",
               line: {{ width: 1 }} }},"#,
            index = run.index,
            seed = run.seed,
        );
    }

    let _ = write!(
        html,
        r#"<script>
Plotly.newPlot("runs", [{traces}],
  {{ xaxis: {{ title: "Generation" }}, yaxis: {{ title: "HV" }},
     margin: {{ t: 10 }}, showlegend: true }},
  {{ responsive: true }});
</script>
"#,
    );
}

fn write_frames(html: &mut String, heat_map: &HeatMap, labels: &str) {
    let mut frames = String::new();
    let mut steps = String::new();
    for (generation, z) in heat_map.generations.iter().zip(&heat_map.frames) {
        let _ = write!(
            frames,
            r#"{{ name: "{generation}", data: [{{ z: {z:?} }}] }},"#,
        );
        let _ = write!(
            steps,
            r#"{{ label: "{generation}", method: "animate",
               args: [["{generation}"], {{ mode: "immediate", frame: {{ duration: 0, redraw: true }} }}] }},"#,
        );
    }

    let _ = write!(
        html,
        r#"<script>
Plotly.newPlot("frames", {{
  data: [{{ z: {first:?}, x: [{labels}], y: [{labels}], type: "heatmap",
            zmin: 0, zmax: 1, colorscale: "Viridis" }}],
  layout: {{ yaxis: {{ autorange: "reversed" }}, margin: {{ t: 10 }},
            sliders: [{{ currentvalue: {{ prefix: "Generation " }}, steps: [{steps}] }}] }},
  frames: [{frames}],
  config: {{ responsive: true }}
}});
</script>
"#,
        first = heat_map.frames.first().cloned().unwrap_or_default(),
    );
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::ClusterAssignment;
    use crate::reducer::ReductionRecord;
    use crate::run::RunResult;

    fn result() -> ExperimentResult {
        let run = RunResult {
            index: 0,
            seed: 1,
            population: Vec::new(),
            history: None,
            convergence: vec![crate::metrics::ConvergenceRecord {
                generation: 0,
                n_evals: 4,
                hypervolume: 0.5,
                igd: Some(0.2),
            }],
            reductions: vec![ReductionRecord {
                generation: 0,
                assignment: ClusterAssignment::new(&[0, 0, 1], 2).unwrap(),
            }],
            n_evals: 4,
            n_invalid: 0,
            duration: core::time::Duration::ZERO,
        };
        ExperimentResult::from_runs("DTLZ2".into(), 3, vec![run]).unwrap()
    }

    #[test]
    fn test_convergence_report_has_charts() {
        let html = convergence_html(&result());
        assert!(html.contains("<div id=\"mean_hv\">"));
        assert!(html.contains("<div id=\"mean_igd\">"));
        assert!(html.contains("Run 0 (seed 1)"));
        assert!(html.ends_with("</html>\n"));
    }

    #[test]
    fn test_heat_map_report() {
        let html = heat_map_html(&result().heat_map(), "DTLZ2 <5>");
        assert!(html.contains("DTLZ2 &lt;5&gt;"));
        assert!(html.contains("id=\"frames\""));
        assert!(html.contains("\"f2\""));
    }
}
