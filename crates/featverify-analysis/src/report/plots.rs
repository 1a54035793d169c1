use ndarray::Array2;
use plotly::box_plot::BoxMean;
use plotly::common::{DashType, ErrorData, ErrorType, Fill, Line, Marker, Mode};
use plotly::layout::{Axis, BarMode, BoxMode, Layout};
use plotly::{Bar, BoxPlot, HeatMap, Histogram, Plot, Scatter};

const PALETTE: [&str; 8] = [
    "31, 119, 180",
    "255, 127, 14",
    "44, 160, 44",
    "214, 39, 40",
    "148, 103, 189",
    "140, 86, 75",
    "227, 119, 194",
    "127, 127, 127",
];

fn rgba(idx: usize, alpha: f64) -> String {
    format!("rgba({}, {})", PALETTE[idx % PALETTE.len()], alpha)
}

/// A seed-averaged curve with its ±1 standard deviation band.
#[derive(Debug, Clone)]
pub struct MeanCurve {
    pub label: String,
    pub x: Vec<f64>,
    pub mean: Vec<f64>,
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
}

fn add_band(plot: &mut Plot, idx: usize, curve: &MeanCurve) {
    let mut band_x = curve.x.clone();
    band_x.extend(curve.x.iter().rev());
    let mut band_y = curve.upper.clone();
    band_y.extend(curve.lower.iter().rev());

    plot.add_trace(
        Scatter::new(curve.x.clone(), curve.mean.clone())
            .name(curve.label.as_str())
            .mode(Mode::Lines)
            .line(Line::new().color(rgba(idx, 1.0))),
    );
    plot.add_trace(
        Scatter::new(band_x, band_y)
            .name(format!("{} ± σ", curve.label).as_str())
            .mode(Mode::Lines)
            .fill(Fill::ToSelf)
            .line(Line::new().width(0.0))
            .fill_color(rgba(idx, 0.15))
            .show_legend(false),
    );
}

fn baseline(x: Vec<f64>, y: Vec<f64>, label: &str) -> Box<Scatter<f64, f64>> {
    Scatter::new(x, y)
        .name(label)
        .mode(Mode::Lines)
        .line(Line::new().color("black").dash(DashType::Dash))
}

/// Mean ROC curves of one model, one per feature subset, with the chance diagonal.
pub fn plot_roc(model: &str, curves: &[MeanCurve]) -> Plot {
    let mut plot = Plot::new();
    for (idx, curve) in curves.iter().enumerate() {
        add_band(&mut plot, idx, curve);
    }
    plot.add_trace(baseline(vec![0.0, 1.0], vec![0.0, 1.0], "Baseline, AUROC=0.5"));
    plot.set_layout(
        Layout::new()
            .title(format!("Receiver-operator curve (ROC), {}", model).as_str())
            .x_axis(Axis::new().title("1 - Specificity"))
            .y_axis(Axis::new().title("Sensitivity")),
    );
    plot
}

/// Mean precision-recall curves of one model with the positive-rate baseline.
pub fn plot_prc(model: &str, curves: &[MeanCurve], pos_rate: f64) -> Plot {
    let mut plot = Plot::new();
    for (idx, curve) in curves.iter().enumerate() {
        add_band(&mut plot, idx, curve);
    }
    plot.add_trace(baseline(
        vec![0.0, 1.0],
        vec![pos_rate, pos_rate],
        format!("Baseline, AUPRC={:.3}", pos_rate).as_str(),
    ));
    plot.set_layout(
        Layout::new()
            .title(format!("Precision-recall curve (PRC), {}", model).as_str())
            .x_axis(Axis::new().title("Recall (Sensitivity)"))
            .y_axis(Axis::new().title("Precision")),
    );
    plot
}

/// Heatmap of a square matrix labelled by `names` on both axes.
pub fn plot_heatmap(names: &[String], matrix: &Array2<f64>, title: &str) -> Plot {
    let z: Vec<Vec<f64>> = matrix.rows().into_iter().map(|r| r.to_vec()).collect();
    let mut plot = Plot::new();
    plot.add_trace(HeatMap::new(names.to_vec(), names.to_vec(), z));
    plot.set_layout(Layout::new().title(title));
    plot
}

/// Confusion matrix as a heatmap, truth on the y axis.
pub fn plot_confusion_matrix(labels: &[f64], counts: &Array2<usize>, title: &str) -> Plot {
    let names: Vec<String> = labels.iter().map(|l| l.to_string()).collect();
    let z: Vec<Vec<f64>> = counts
        .rows()
        .into_iter()
        .map(|r| r.iter().map(|v| *v as f64).collect())
        .collect();
    let mut plot = Plot::new();
    plot.add_trace(HeatMap::new(names.clone(), names, z));
    plot.set_layout(
        Layout::new()
            .title(title)
            .x_axis(Axis::new().title("Predicted"))
            .y_axis(Axis::new().title("Truth")),
    );
    plot
}

/// True against predicted values with the identity line.
pub fn plot_regression(y_true: &[f64], y_pred: &[f64], target_label: &str, title: &str) -> Plot {
    let lo = y_true.iter().chain(y_pred).copied().fold(f64::INFINITY, f64::min);
    let hi = y_true.iter().chain(y_pred).copied().fold(f64::NEG_INFINITY, f64::max);
    let mut plot = Plot::new();
    plot.add_trace(
        Scatter::new(y_true.to_vec(), y_pred.to_vec())
            .name("Samples")
            .mode(Mode::Markers)
            .marker(Marker::new().color(rgba(0, 0.7))),
    );
    plot.add_trace(baseline(vec![lo, hi], vec![lo, hi], "y = x"));
    plot.set_layout(
        Layout::new()
            .title(title)
            .x_axis(Axis::new().title(format!("True {}", target_label).as_str()))
            .y_axis(Axis::new().title(format!("Predicted {}", target_label).as_str())),
    );
    plot
}

/// One box per feature.
pub fn plot_boxes(features: &[(String, Vec<f64>)], title: &str) -> Plot {
    let mut plot = Plot::new();
    for (name, values) in features {
        plot.add_trace(BoxPlot::new(values.clone()).name(name.as_str()).box_mean(BoxMean::True));
    }
    plot.set_layout(Layout::new().title(title).show_legend(false));
    plot
}

/// Boxes per feature, grouped side by side by target class.
pub fn plot_boxes_by_class(groups: &[(String, Vec<String>, Vec<f64>)], title: &str) -> Plot {
    let mut plot = Plot::new();
    for (idx, (class, names, values)) in groups.iter().enumerate() {
        plot.add_trace(
            BoxPlot::new_xy(names.clone(), values.clone())
                .name(class.as_str())
                .marker(Marker::new().color(rgba(idx, 1.0))),
        );
    }
    plot.set_layout(Layout::new().title(title).box_mode(BoxMode::Group));
    plot
}

/// Overlaid histograms, one per feature.
pub fn plot_distributions(features: &[(String, Vec<f64>)], title: &str) -> Plot {
    let mut plot = Plot::new();
    for (name, values) in features {
        plot.add_trace(Histogram::new(values.clone()).name(name.as_str()).opacity(0.6));
    }
    plot.set_layout(
        Layout::new()
            .title(title)
            .bar_mode(BarMode::Overlay)
            .x_axis(Axis::new().title("Value"))
            .y_axis(Axis::new().title("Count")),
    );
    plot
}

/// Cross-validated score against the number of retained features.
pub fn plot_rfecv(n_features: &[usize], means: &[f64], stds: &[f64], scoring: &str, title: &str) -> Plot {
    let x: Vec<f64> = n_features.iter().map(|n| *n as f64).collect();
    let mut plot = Plot::new();
    plot.add_trace(
        Scatter::new(x, means.to_vec())
            .name(scoring)
            .mode(Mode::LinesMarkers)
            .error_y(ErrorData::new(ErrorType::Data).array(stds.to_vec())),
    );
    plot.set_layout(
        Layout::new()
            .title(title)
            .x_axis(Axis::new().title("Number of features selected"))
            .y_axis(Axis::new().title(format!("Cross-validated {}", scoring).as_str())),
    );
    plot
}

/// Horizontal-axis feature names with importance bars and their spread.
pub fn plot_importance(names: &[String], importances: &[f64], stds: &[f64], title: &str) -> Plot {
    let mut plot = Plot::new();
    plot.add_trace(
        Bar::new(names.to_vec(), importances.to_vec())
            .name("Permutation importance")
            .error_y(ErrorData::new(ErrorType::Data).array(stds.to_vec())),
    );
    plot.set_layout(
        Layout::new()
            .title(title)
            .y_axis(Axis::new().title("Mean score decrease")),
    );
    plot
}
