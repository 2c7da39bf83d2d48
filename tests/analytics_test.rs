//! Properties of the aggregation, scoring and rule pipeline.
//!
//! Run with: cargo test --test analytics_test

use agrisense::analytics::rules::{IrrigationRecommendation, IrrigationUrgency, NeedLevel};
use agrisense::analytics::{
    aggregate, recommend, soil_quality, AggregatedMetrics, Npk, Prediction, PredictionType,
    ReadingSample,
};

fn sample(n: f64, p: f64, k: f64, moisture: f64, temperature: f64) -> ReadingSample {
    ReadingSample {
        nitrogen: Some(n),
        phosphorous: Some(p),
        potassium: Some(k),
        moisture: Some(moisture),
        temperature: Some(temperature),
    }
}

fn npk(n: f64, p: f64, k: f64) -> Npk {
    Npk {
        nitrogen: n,
        phosphorous: p,
        potassium: k,
    }
}

#[test]
fn no_readings_fall_back_to_field_defaults() {
    let metrics = aggregate(&[]);
    assert_eq!(metrics.average_temp, 25.0);
    assert_eq!(metrics.average_moisture, 50.0);
    assert_eq!(metrics.average_npk, npk(40.0, 30.0, 45.0));
    assert_eq!(metrics.soil_quality, 25);
}

#[test]
fn means_divide_by_total_reading_count() {
    let readings = [
        sample(30.0, 30.0, 30.0, 60.0, 24.0),
        ReadingSample {
            temperature: Some(36.0),
            ..ReadingSample::default()
        },
    ];
    let metrics = aggregate(&readings);
    assert_eq!(metrics.average_npk, npk(15.0, 15.0, 15.0));
    assert_eq!(metrics.average_moisture, 30.0);
    assert_eq!(metrics.average_temp, 30.0);
}

#[test]
fn soil_quality_stays_within_bounds() {
    for level in [-100.0, 0.0, 10.0, 70.0, 140.0, 1_000.0, f64::INFINITY] {
        let score = soil_quality(&npk(level, level, level));
        assert!(score <= 100, "{level} scored {score}");
    }
    assert_eq!(soil_quality(&npk(1_000.0, 1_000.0, 1_000.0)), 100);
}

#[test]
fn soil_quality_never_drops_as_one_nutrient_rises() {
    let base = npk(40.0, 30.0, 45.0);
    let setters: [fn(&mut Npk, f64); 3] = [
        |n, v| n.nitrogen = v,
        |n, v| n.phosphorous = v,
        |n, v| n.potassium = v,
    ];

    for set in setters {
        let mut previous = 0;
        for step in 0..=50 {
            let mut levels = base;
            set(&mut levels, f64::from(step) * 10.0);
            let score = soil_quality(&levels);
            assert!(score >= previous, "{levels:?} scored {score} after {previous}");
            previous = score;
        }
    }
}

#[test]
fn nitrogen_above_its_maximum_saturates() {
    let at_max = soil_quality(&npk(140.0, 30.0, 45.0));
    assert_eq!(soil_quality(&npk(500.0, 30.0, 45.0)), at_max);
}

fn irrigation(moisture: f64, temperature: f64) -> IrrigationRecommendation {
    let metrics = AggregatedMetrics::new(temperature, moisture, npk(50.0, 50.0, 50.0));
    let Prediction::Irrigation(rec) = recommend(PredictionType::Irrigation, &metrics) else {
        panic!("expected irrigation recommendation");
    };
    rec
}

#[test]
fn dry_hot_soil_needs_water_immediately() {
    let rec = irrigation(40.0, 30.0);
    assert!(rec.needs_water);
    assert_eq!(rec.recommended_amount, 20.0);
    assert_eq!(rec.frequency, IrrigationUrgency::Immediate);
}

#[test]
fn moist_soil_needs_no_water() {
    let rec = irrigation(65.0, 25.0);
    assert!(!rec.needs_water);
    assert_eq!(rec.recommended_amount, 0.0);
    assert_eq!(rec.frequency, IrrigationUrgency::ThisWeek);
}

#[test]
fn fertilizer_need_uses_strict_thresholds() {
    let nitrogen_need = |level: f64| {
        let metrics = AggregatedMetrics::new(25.0, 50.0, npk(level, 50.0, 50.0));
        let Prediction::Fertilizer(rec) = recommend(PredictionType::Fertilizer, &metrics) else {
            panic!("expected fertilizer recommendation");
        };
        rec.recommendations.nitrogen
    };
    assert_eq!(nitrogen_need(35.0), NeedLevel::High);
    assert_eq!(nitrogen_need(40.0), NeedLevel::Moderate);
    assert_eq!(nitrogen_need(50.0), NeedLevel::Moderate);
    assert_eq!(nitrogen_need(60.0), NeedLevel::Low);
    assert_eq!(nitrogen_need(70.0), NeedLevel::Low);
}

#[test]
fn complete_data_earns_full_confidence() {
    let metrics = aggregate(&[sample(50.0, 50.0, 50.0, 55.0, 27.0)]);
    let Prediction::Crop(rec) = recommend(PredictionType::Crop, &metrics) else {
        panic!("expected crop recommendation");
    };
    assert_eq!(rec.confidence, 100);
}

fn crop_confidence(temperature: f64, moisture: f64, levels: Npk) -> u8 {
    let metrics = AggregatedMetrics::new(temperature, moisture, levels);
    let Prediction::Crop(rec) = recommend(PredictionType::Crop, &metrics) else {
        panic!("expected crop recommendation");
    };
    rec.confidence
}

#[test]
fn each_missing_dimension_costs_thirty_points() {
    let full = npk(50.0, 50.0, 50.0);
    let none = npk(0.0, 0.0, 0.0);

    assert_eq!(crop_confidence(0.0, 55.0, full), 70);
    assert_eq!(crop_confidence(0.0, 55.0, none), 40);
    assert_eq!(crop_confidence(0.0, 0.0, none), 10);
    // one absent component costs the same as all three
    assert_eq!(crop_confidence(27.0, 55.0, npk(0.0, 50.0, 50.0)), 70);
}

#[test]
fn every_recommender_reports_the_same_confidence() {
    let metrics = AggregatedMetrics::new(0.0, 55.0, npk(50.0, 50.0, 50.0));
    for kind in [
        PredictionType::Crop,
        PredictionType::Irrigation,
        PredictionType::Fertilizer,
    ] {
        let json = serde_json::to_value(recommend(kind, &metrics)).unwrap();
        assert_eq!(json["confidence"], 70, "{kind}");
    }
}

#[test]
fn crop_list_has_no_duplicates() {
    let metrics = aggregate(&[sample(90.0, 90.0, 90.0, 80.0, 33.0)]);
    let Prediction::Crop(rec) = recommend(PredictionType::Crop, &metrics) else {
        panic!("expected crop recommendation");
    };
    let mut unique = rec.recommended_crops.clone();
    unique.sort();
    unique.dedup();
    assert_eq!(unique.len(), rec.recommended_crops.len());
}

#[test]
fn prediction_type_parsing_is_exact() {
    assert_eq!("crop".parse::<PredictionType>(), Ok(PredictionType::Crop));
    assert!("Crop".parse::<PredictionType>().is_err());
    assert!("harvest".parse::<PredictionType>().is_err());
}

#[test]
fn fertilizer_levels_serialize_lowercase() {
    let metrics = AggregatedMetrics::new(25.0, 50.0, npk(39.9, 40.0, 60.0));
    let json = serde_json::to_value(recommend(PredictionType::Fertilizer, &metrics)).unwrap();
    assert_eq!(json["recommendations"]["nitrogen"], "high");
    assert_eq!(json["recommendations"]["phosphorous"], "moderate");
    assert_eq!(json["recommendations"]["potassium"], "low");
}
