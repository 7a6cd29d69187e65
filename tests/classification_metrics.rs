use approx::assert_abs_diff_eq;
use baseline_perf_ml::data_handler::{label_frequencies, sample_by_frequency};
use baseline_perf_ml::model_perf::statistics::{
    accuracy, classification_report, f1_from, precision_for_label, recall_for_label,
};
use baseline_perf_ml::renderers::html_widgets::BaseWidgetInfo;
use baseline_perf_ml::reporting::ReportSnapshot;
use baseline_perf_ml::{
    ClassificationDummyMetric, ClassificationDummyMetricResults, ClassificationQualityMetric,
    ClassificationQualityMetricResult, ClassificationThreshold, ColumnData, ColumnMapping,
    Dataset, InputData, Label, MetricError, PredictionColumns, Renderable, TopK,
};

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

fn labels_of(values: &[&str]) -> Vec<Label> {
    values.iter().map(|v| Label::from(*v)).collect()
}

fn ints(values: &[i64]) -> Vec<Label> {
    values.iter().map(|v| Label::Int(*v)).collect()
}

fn binary_with_probas() -> Dataset {
    Dataset::new()
        .with_column("target", ColumnData::Int(vec![1, 0, 1, 0, 1, 1, 0, 0]))
        .unwrap()
        .with_column(
            "prediction",
            ColumnData::Float(vec![0.9, 0.3, 0.8, 0.6, 0.65, 0.4, 0.1, 0.75]),
        )
        .unwrap()
}

#[test]
fn test_dummy_without_prediction_column() {
    let target = ["cat", "dog", "cat", "cat"];
    let current = Dataset::new()
        .with_column("target", ColumnData::Str(strings(&target)))
        .unwrap();
    let data = InputData::new(current, None, ColumnMapping::default());

    let result = ClassificationDummyMetric::default().evaluate(&data).unwrap();
    assert!(result.model_quality.is_none());
    assert!(result.by_reference_dummy.is_none());

    let target = labels_of(&target);
    let preds = sample_by_frequency(&label_frequencies(&target), 4, 0).unwrap();
    let cat = Label::from("cat");
    let precision = precision_for_label(&target, &preds, &cat);
    let recall = recall_for_label(&target, &preds, &cat);
    assert_eq!(result.dummy.accuracy, accuracy(&target, &preds).unwrap());
    assert_eq!(result.dummy.precision, precision);
    assert_eq!(result.dummy.recall, recall);
    assert_eq!(result.dummy.f1, f1_from(precision, recall));
    assert!(result.dummy.roc_auc.is_none());
    assert!(result.dummy.log_loss.is_none());
    assert_eq!(
        result.metrics_matrix,
        classification_report(&target, &preds).unwrap()
    );
}

#[test]
fn test_dummy_is_reproducible() {
    let values: Vec<String> = (0..100)
        .map(|i| match i % 10 {
            0..=4 => "A",
            5..=7 => "B",
            _ => "C",
        })
        .map(String::from)
        .collect();
    let current = Dataset::new()
        .with_column("target", ColumnData::Str(values))
        .unwrap();
    let data = InputData::new(current, None, ColumnMapping::default());
    let metric = ClassificationDummyMetric::default();
    let first = metric.evaluate(&data).unwrap();
    let second = metric.evaluate(&data).unwrap();
    assert_eq!(first, second);
    // three classes: macro averages, no binary rates
    assert!(first.dummy.tpr.is_none());
}

#[test]
fn test_dummy_threshold_correction_at_point_seven() {
    let data = InputData::new(binary_with_probas(), None, ColumnMapping::default());
    let metric = ClassificationDummyMetric::new(ClassificationThreshold::probability(0.7).unwrap());
    let result = metric.evaluate(&data).unwrap();

    let target = ints(&[1, 0, 1, 0, 1, 1, 0, 0]);
    let preds = sample_by_frequency(&label_frequencies(&target), 8, 0).unwrap();
    let (pos, neg) = (Label::Int(1), Label::Int(0));

    let precision = precision_for_label(&target, &preds, &pos);
    let recall = recall_for_label(&target, &preds, &pos) * 0.6;
    assert_abs_diff_eq!(result.dummy.precision, precision, epsilon = 1e-12);
    assert_abs_diff_eq!(result.dummy.recall, recall, epsilon = 1e-12);
    assert_eq!(result.dummy.roc_auc, Some(0.5));
    assert_abs_diff_eq!(result.dummy.log_loss.unwrap(), 2_f64.ln(), epsilon = 1e-12);

    assert_eq!(result.metrics_matrix.classes.len(), 2);
    assert_eq!(result.metrics_matrix.classes[0].0, "1");
    let positive = result.metrics_matrix.class("1").unwrap();
    assert_eq!(positive.precision, result.dummy.precision);
    assert_eq!(positive.recall, result.dummy.recall);
    let negative = result.metrics_matrix.class("0").unwrap();
    assert_abs_diff_eq!(
        negative.precision,
        precision_for_label(&target, &preds, &neg) * 0.6,
        epsilon = 1e-12
    );
    assert_abs_diff_eq!(
        negative.recall,
        recall_for_label(&target, &preds, &neg),
        epsilon = 1e-12
    );
    assert!(result.metrics_matrix.accuracy.is_none());

    // model quality is taken from the default threshold quality metric
    let quality = ClassificationQualityMetric::default().evaluate(&data).unwrap();
    assert_eq!(result.model_quality, Some(quality.current));
}

#[test]
fn test_dummy_default_threshold_leaves_scores_untouched() {
    let data = InputData::new(binary_with_probas(), None, ColumnMapping::default());
    let result = ClassificationDummyMetric::default().evaluate(&data).unwrap();

    let target = ints(&[1, 0, 1, 0, 1, 1, 0, 0]);
    let preds = sample_by_frequency(&label_frequencies(&target), 8, 0).unwrap();
    let pos = Label::Int(1);
    assert_eq!(result.dummy.precision, precision_for_label(&target, &preds, &pos));
    assert_eq!(result.dummy.recall, recall_for_label(&target, &preds, &pos));
    assert_eq!(result.dummy.roc_auc, Some(0.5));
}

#[test]
fn test_dummy_top_k_threshold() {
    let data = InputData::new(binary_with_probas(), None, ColumnMapping::default());
    // top 2 of 8 rows: the cut-off is 0.8
    let metric = ClassificationDummyMetric::new(ClassificationThreshold::top_k(TopK::Count(2)));
    let result = metric.evaluate(&data).unwrap();

    let target = ints(&[1, 0, 1, 0, 1, 1, 0, 0]);
    let preds = sample_by_frequency(&label_frequencies(&target), 8, 0).unwrap();
    let recall = recall_for_label(&target, &preds, &Label::Int(1));
    assert_abs_diff_eq!(result.dummy.recall, recall * 0.4, epsilon = 1e-12);
}

#[test]
fn test_dummy_boundary_thresholds_stay_finite() {
    for t in [0.0, 1.0] {
        let data = InputData::new(binary_with_probas(), None, ColumnMapping::default());
        let metric = ClassificationDummyMetric::new(ClassificationThreshold::probability(t).unwrap());
        let result = metric.evaluate(&data).unwrap();
        assert!(result.dummy.precision.is_finite());
        assert!(result.dummy.recall.is_finite());
        assert!(result.dummy.f1.is_finite());
        for (_, class) in result.metrics_matrix.classes.iter() {
            assert!(class.f1_score.is_finite());
        }
    }
}

#[test]
fn test_dummy_by_reference_uses_reference_frequencies() {
    let current_target = vec![1, 0, 1, 0, 1, 1, 0, 0];
    let reference_target = vec![1, 1, 1, 0];
    let current = Dataset::new()
        .with_column("target", ColumnData::Int(current_target.clone()))
        .unwrap();
    let reference = Dataset::new()
        .with_column("target", ColumnData::Int(reference_target.clone()))
        .unwrap();
    let data = InputData::new(current, Some(reference), ColumnMapping::default());
    let result = ClassificationDummyMetric::default().evaluate(&data).unwrap();

    let target: Vec<Label> = current_target.into_iter().map(Label::Int).collect();
    let reference: Vec<Label> = reference_target.into_iter().map(Label::Int).collect();
    let preds = sample_by_frequency(&label_frequencies(&reference), 8, 1).unwrap();
    let by_reference = result.by_reference_dummy.unwrap();
    assert_eq!(preds.len(), 8);
    assert_eq!(by_reference.accuracy, accuracy(&target, &preds).unwrap());
    assert_eq!(
        by_reference.precision,
        precision_for_label(&target, &preds, &Label::Int(1))
    );
}

#[test]
fn test_dummy_multiclass_log_loss_uses_uniform_prediction() {
    let current = Dataset::new()
        .with_column("target", ColumnData::Str(strings(&["a", "b", "c", "a"])))
        .unwrap()
        .with_column("a", ColumnData::Float(vec![0.7, 0.2, 0.1, 0.5]))
        .unwrap()
        .with_column("b", ColumnData::Float(vec![0.2, 0.6, 0.1, 0.3]))
        .unwrap()
        .with_column("c", ColumnData::Float(vec![0.1, 0.2, 0.8, 0.2]))
        .unwrap();
    let mapping = ColumnMapping::default()
        .with_prediction(PredictionColumns::Probas(strings(&["a", "b", "c"])));
    let data = InputData::new(current, None, mapping);
    let result = ClassificationDummyMetric::default().evaluate(&data).unwrap();
    assert_abs_diff_eq!(result.dummy.log_loss.unwrap(), 3_f64.ln(), epsilon = 1e-12);
    assert_eq!(result.dummy.roc_auc, Some(0.5));
    assert!(result.metrics_matrix.macro_avg.is_some());

    let quality = result.model_quality.unwrap();
    assert_eq!(quality.accuracy, 1.0);
    assert_abs_diff_eq!(quality.roc_auc.unwrap(), 1.0);
}

#[test]
fn test_missing_columns_are_reported() {
    let only_prediction = Dataset::new()
        .with_column("prediction", ColumnData::Int(vec![1, 0]))
        .unwrap();
    let data = InputData::new(only_prediction, None, ColumnMapping::default());
    let err = ClassificationDummyMetric::default().evaluate(&data).unwrap_err();
    assert!(matches!(err, MetricError::MissingColumn(_)));
    assert_eq!(err.to_string(), "The column 'target' should present");

    let err = ClassificationQualityMetric::default().evaluate(&data).unwrap_err();
    assert_eq!(
        err.to_string(),
        "The columns 'target' and 'prediction' columns should be present"
    );
}

#[test]
fn test_digit_string_target_with_probability_columns() {
    let current = Dataset::from_columns([
        ("target", ColumnData::Str(strings(&["1", "0", "1", "0"]))),
        ("1", ColumnData::Float(vec![0.9, 0.2, 0.7, 0.4])),
        ("0", ColumnData::Float(vec![0.1, 0.8, 0.3, 0.6])),
    ])
    .unwrap();
    let mapping = ColumnMapping::default()
        .with_prediction(PredictionColumns::Probas(strings(&["1", "0"])));
    let data = InputData::new(current, None, mapping);

    let quality = ClassificationQualityMetric::default().evaluate(&data).unwrap();
    assert_abs_diff_eq!(quality.current.accuracy, 1.0);
    assert_abs_diff_eq!(quality.current.precision, 1.0);
    assert_abs_diff_eq!(quality.current.recall, 1.0);
    assert_abs_diff_eq!(quality.current.roc_auc.unwrap(), 1.0);
    assert!(quality.current.log_loss.unwrap() > 0.0);

    let dummy = ClassificationDummyMetric::default().evaluate(&data).unwrap();
    let target = labels_of(&["1", "0", "1", "0"]);
    let preds = sample_by_frequency(&label_frequencies(&target), 4, 0).unwrap();
    let one = Label::from("1");
    assert_eq!(dummy.dummy.accuracy, accuracy(&target, &preds).unwrap());
    assert_eq!(dummy.dummy.precision, precision_for_label(&target, &preds, &one));
    assert_abs_diff_eq!(dummy.dummy.log_loss.unwrap(), 2_f64.ln(), epsilon = 1e-12);
    assert!(dummy.metrics_matrix.class("1").is_some());
}

#[test]
fn test_quality_with_reference() {
    let current = binary_with_probas();
    let reference = Dataset::new()
        .with_column("target", ColumnData::Int(vec![1, 0, 0, 1]))
        .unwrap()
        .with_column("prediction", ColumnData::Float(vec![0.8, 0.2, 0.6, 0.3]))
        .unwrap();
    let data = InputData::new(current, Some(reference), ColumnMapping::default());
    let result = ClassificationQualityMetric::default().evaluate(&data).unwrap();

    let reference = result.reference.as_ref().unwrap();
    assert_abs_diff_eq!(reference.accuracy, 0.5);
    assert_abs_diff_eq!(reference.precision, 0.5);
    assert_abs_diff_eq!(reference.recall, 0.5);
    assert_abs_diff_eq!(reference.roc_auc.unwrap(), 0.75);

    let widgets = result.render_html();
    assert_eq!(widgets.len(), 3);
    assert!(matches!(
        &widgets[2],
        BaseWidgetInfo::Counter { title, .. } if title == "Reference: Model Quality Metrics"
    ));
}

#[test]
fn test_render_json_round_trips() {
    let current = binary_with_probas();
    let reference = current.clone();
    let data = InputData::new(current, Some(reference), ColumnMapping::default());

    let quality = ClassificationQualityMetric::default().evaluate(&data).unwrap();
    let json = quality.render_json().unwrap();
    assert_eq!(json["target_name"], "target");
    let parsed: ClassificationQualityMetricResult = serde_json::from_value(json).unwrap();
    assert_eq!(parsed, quality);

    let metric = ClassificationDummyMetric::new(ClassificationThreshold::probability(0.7).unwrap());
    let dummy = metric.calculate(&data, Some(&quality)).unwrap();
    let json = dummy.render_json().unwrap();
    let keys: Vec<&str> = json.as_object().unwrap().keys().map(|k| k.as_str()).collect();
    assert_eq!(
        keys,
        vec!["dummy", "by_reference_dummy", "model_quality", "metrics_matrix"]
    );
    assert!(json["metrics_matrix"]["1"]["f1-score"].is_number());
    let parsed: ClassificationDummyMetricResults = serde_json::from_value(json).unwrap();
    assert_eq!(parsed, dummy);
}

#[test]
fn test_dummy_html_is_rounded_but_json_is_not() {
    let current = binary_with_probas();
    let data = InputData::new(current.clone(), Some(current), ColumnMapping::default());
    let metric = ClassificationDummyMetric::default();
    let result = metric.evaluate(&data).unwrap();

    let widgets = result.render_html();
    let BaseWidgetInfo::Table {
        column_names, data: rows, ..
    } = &widgets[1]
    else {
        panic!("expected a table widget");
    };
    assert_eq!(
        column_names,
        &strings(&["Metric", "Dummy (by reference)", "Dummy (by current)", "Model"])
    );
    let rendered = serde_json::to_value(&rows[3][2]).unwrap().as_f64().unwrap();
    assert_eq!(rendered, (result.dummy.f1 * 1000.0).round() / 1000.0);

    let mut snapshot = ReportSnapshot::new();
    snapshot.push(&metric, &result).unwrap();
    let stored = &snapshot.get("ClassificationDummyMetric").unwrap().result;
    assert_eq!(stored["dummy"]["f1"].as_f64().unwrap(), result.dummy.f1);
}
