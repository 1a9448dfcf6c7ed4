//! Unit and end-to-end tests for acc-pipeline.

#[cfg(test)]
mod fixtures {
    use acc_core::{AccessConfig, Coord, Crs};
    use acc_network::{PointSet, RoadNetwork, RoadNetworkBuilder, SpeedTable};

    use crate::{Category, PipelineBuilder};

    pub const F: f64 = 999_999_999.0;

    /// A(1)-B(2)-C(3)-D(4) along y = 0 at x = 0, 100, 300, 600, 20 km/h,
    /// plus isolated E(5) at x = 5000.
    pub fn network() -> RoadNetwork {
        let mut b = RoadNetworkBuilder::new(Crs::projected_metres());
        for (id, x) in [(1, 0.0), (2, 100.0), (3, 300.0), (4, 600.0), (5, 5000.0)] {
            b.add_node(id, Coord::new(x, 0.0));
        }
        b.add_road(1, 2, 100.0, "residential");
        b.add_road(2, 3, 200.0, "residential");
        b.add_road(3, 4, 300.0, "residential");
        b.build(&SpeedTable::new().with_default(20.0).unwrap()).unwrap()
    }

    /// o1 on A, o2 50 m off B, o3 10 m off E, o4 far outside the snap
    /// tolerance.
    pub fn origins() -> PointSet {
        let mut p = PointSet::new("villages", vec!["region".into(), "population".into()]);
        p.push("o1", Coord::new(0.0, 0.0), vec!["North".into(), "100".into()]).unwrap();
        p.push("o2", Coord::new(100.0, 50.0), vec!["North".into(), "300".into()]).unwrap();
        p.push("o3", Coord::new(5000.0, 10.0), vec!["South".into(), "50".into()]).unwrap();
        p.push("o4", Coord::new(1.0e7, 0.0), vec!["South".into(), "25".into()]).unwrap();
        p
    }

    pub fn facilities(name: &str, xs: &[f64]) -> PointSet {
        let mut p = PointSet::new(name, Vec::new());
        for (i, &x) in xs.iter().enumerate() {
            p.push(format!("{name}-{i}"), Coord::new(x, 0.0), Vec::new()).unwrap();
        }
        p
    }

    pub fn config() -> AccessConfig {
        AccessConfig {
            crs: Crs::projected_metres(),
            num_nearest: 2,
            max_snap_distance: Some(1000.0),
            ..AccessConfig::default()
        }
    }

    /// Hospitals on D and C, one school on B.
    pub fn builder_with(config: AccessConfig) -> PipelineBuilder {
        PipelineBuilder::new(network(), config, origins())
            .category(Category::new("hospital", facilities("hospital", &[600.0, 300.0])))
            .category(Category::new("school", facilities("school", &[100.0])))
    }

    pub fn builder() -> PipelineBuilder {
        builder_with(config())
    }

    /// Flat-ground Tobler seconds for `metres` at 6 km/h peak.
    pub fn flat_walk(metres: f64) -> f64 {
        metres / 1000.0 * 3600.0 / (6.0 * (-0.175f64).exp())
    }

    pub fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }
}

// ── Categories ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod category {
    use acc_network::PointSet;

    use crate::{ordinal, Category};

    #[test]
    fn ordinals() {
        let got: Vec<String> = [1, 2, 3, 4, 11, 12, 13, 21, 22, 101, 111].iter().map(|&k| ordinal(k)).collect();
        assert_eq!(got, ["1st", "2nd", "3rd", "4th", "11th", "12th", "13th", "21st", "22nd", "101st", "111th"]);
    }

    #[test]
    fn column_names_use_prefix() {
        let c = Category::new("pharmacies", PointSet::new("pharmacies", Vec::new())).with_prefix("pharm");
        assert_eq!(c.drive_columns(2), ["pharm-1st", "pharm-2nd"]);
        assert_eq!(c.multimodal_columns(1), ["pharm-mm-1st"]);
        assert_eq!(c.straight_column(), "pharm-straight");
    }
}

// ── Walking leg ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod multimodal {
    use acc_core::{AccessConfig, FailValue};

    use crate::{combine, WalkModel};

    #[test]
    fn tobler_flat_ground() {
        let m = WalkModel::from_config(&AccessConfig::default());
        let speed = m.speed_kmh(0.0);
        assert!((speed - 5.0367).abs() < 1e-3, "speed {speed}");
        let leg = m.walk_time(100.0, Some(12.0), Some(12.0));
        assert!((leg.seconds - 71.47).abs() < 0.01, "time {}", leg.seconds);
        assert!(!leg.missing_elevation);
    }

    #[test]
    fn peak_speed_on_gentle_descent() {
        let m = WalkModel::new(6.0, 0.1);
        assert!((m.speed_kmh(-0.05) - 6.0).abs() < 1e-12);
        assert!(m.speed_kmh(0.2) < m.speed_kmh(0.0));
    }

    #[test]
    fn uphill_is_slower_than_downhill_of_same_grade() {
        let m = WalkModel::new(6.0, 0.1);
        let up = m.walk_time(100.0, Some(0.0), Some(10.0)).seconds;
        let down = m.walk_time(100.0, Some(10.0), Some(0.0)).seconds;
        assert!(up > down);
    }

    #[test]
    fn steep_slope_clamped_to_floor() {
        let m = WalkModel::new(6.0, 0.5);
        assert_eq!(m.speed_kmh(5.0), 0.5);
        assert_eq!(m.speed_kmh(f64::NAN), 0.5);
        // 100 m at 0.5 km/h
        assert!((m.walk_time(100.0, Some(0.0), Some(500.0)).seconds - 720.0).abs() < 1e-9);
    }

    #[test]
    fn zero_distance_is_zero_time() {
        let m = WalkModel::new(6.0, 0.1);
        assert_eq!(m.walk_time(0.0, Some(0.0), Some(30.0)).seconds, 0.0);
    }

    #[test]
    fn missing_elevation_walks_flat() {
        let m = WalkModel::new(6.0, 0.1);
        let flat = m.walk_time(100.0, Some(5.0), Some(5.0));
        let missing = m.walk_time(100.0, None, Some(40.0));
        assert_eq!(missing.seconds, flat.seconds);
        assert!(missing.missing_elevation);
    }

    #[test]
    fn combine_absorbs_fail_value() {
        let fail = FailValue::DEFAULT;
        assert_eq!(combine(fail.value(), 5.0, fail), fail.value());
        assert_eq!(combine(5.0, fail.value(), fail), fail.value());
        assert_eq!(combine(5.0, 7.5, fail), 12.5);
        assert_eq!(combine(fail.value() - 1.0, 5.0, fail), fail.value());
    }
}

// ── Classes ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod classes {
    use acc_core::FailValue;

    use super::fixtures::F;
    use crate::{composite, percentile, AccessClass, ClassBreaks};

    #[test]
    fn percentile_interpolates() {
        let v = [10.0, 20.0, 30.0, 40.0, 50.0];
        assert_eq!(percentile(&v, 0.25), Some(20.0));
        assert_eq!(percentile(&v, 0.5), Some(30.0));
        assert_eq!(percentile(&[0.0, 10.0], 0.25), Some(2.5));
        assert_eq!(percentile(&[], 0.5), None);
    }

    #[test]
    fn composite_is_mean_or_fail() {
        let fail = FailValue::DEFAULT;
        assert_eq!(composite(&[10.0, 20.0], fail), 15.0);
        assert_eq!(composite(&[10.0, F], fail), F);
    }

    #[test]
    fn quartile_classes() {
        let fail = FailValue::DEFAULT;
        let b = ClassBreaks::from_composites([10.0, 20.0, 30.0, 40.0, 50.0, F], fail).unwrap();
        assert_eq!((b.p25, b.p50, b.p75), (20.0, 30.0, 40.0));
        assert_eq!(b.classify(20.0, fail), AccessClass::High);
        assert_eq!(b.classify(25.0, fail), AccessClass::Average);
        assert_eq!(b.classify(40.0, fail), AccessClass::Low);
        assert_eq!(b.classify(41.0, fail), AccessClass::NoAccess);
        assert_eq!(b.classify(F, fail), AccessClass::NoAccess);
        assert_eq!(AccessClass::Average.label(), "average accessibility");
    }

    #[test]
    fn no_reached_composites_no_breaks() {
        assert!(ClassBreaks::from_composites([F, F], FailValue::DEFAULT).is_none());
    }
}

// ── Elevation ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod elevation {
    use acc_core::{Coord, Crs};

    use crate::{ElevationSource, FlatTerrain, PipelineError, SampledElevation};

    #[test]
    fn flat_and_closure_sources() {
        assert_eq!(FlatTerrain.elevation_at(Coord::new(3.0, 4.0)), Some(0.0));
        let ramp = |c: Coord| Some(c.x / 10.0);
        assert_eq!(ramp.elevation_at(Coord::new(50.0, 0.0)), Some(5.0));
    }

    #[test]
    fn sampled_nearest_within_radius() {
        let csv = "x,y,elevation\n0,0,10\n100,0,20\n1000,0,NaN\n";
        let src = SampledElevation::load_reader(csv.as_bytes(), Crs::projected_metres(), 30.0).unwrap();
        assert_eq!(src.len(), 2);
        assert_eq!(src.elevation_at(Coord::new(10.0, 5.0)), Some(10.0));
        assert_eq!(src.elevation_at(Coord::new(90.0, 0.0)), Some(20.0));
        assert_eq!(src.elevation_at(Coord::new(50.0, 0.0)), None);
        assert_eq!(src.elevation_at(Coord::new(f64::NAN, 0.0)), None);
    }

    #[test]
    fn geographic_radius_in_metres() {
        let src = SampledElevation::new(Crs::Geographic, 200.0, [(Coord::new(-66.0, 18.0), 75.0)]);
        // ~111 m north
        assert_eq!(src.elevation_at(Coord::new(-66.0, 18.001)), Some(75.0));
        // ~1.1 km north
        assert_eq!(src.elevation_at(Coord::new(-66.0, 18.01)), None);
    }

    #[test]
    fn bad_radius_rejected() {
        let csv = "x,y,elevation\n";
        let err = SampledElevation::load_reader(csv.as_bytes(), Crs::projected_metres(), 0.0);
        assert!(matches!(err, Err(PipelineError::Config(_))));
    }
}

// ── Builder ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod builder {
    use acc_core::{AccessConfig, Crs};

    use super::fixtures::{builder, builder_with, config, facilities, network, origins};
    use crate::{Category, PipelineBuilder, PipelineError, RegionSpec};

    #[test]
    fn requires_a_category() {
        let r = PipelineBuilder::new(network(), config(), origins()).build();
        assert!(matches!(r, Err(PipelineError::Config(_))));
    }

    #[test]
    fn rejects_duplicate_names_and_prefixes() {
        let dup_name = builder().category(Category::new("school", facilities("s", &[0.0]))).build();
        assert!(matches!(dup_name, Err(PipelineError::Config(m)) if m.contains("name")));

        let dup_prefix = builder()
            .category(Category::new("clinic", facilities("c", &[0.0])).with_prefix("hospital"))
            .build();
        assert!(matches!(dup_prefix, Err(PipelineError::Config(m)) if m.contains("prefix")));
    }

    #[test]
    fn rejects_invalid_config() {
        let bad = AccessConfig { num_nearest: 0, ..config() };
        assert!(matches!(builder_with(bad).build(), Err(PipelineError::Core(_))));
    }

    #[test]
    fn rejects_crs_mismatch() {
        let geo = AccessConfig { crs: Crs::Geographic, ..config() };
        assert!(matches!(builder_with(geo).build(), Err(PipelineError::Config(m)) if m.contains("CRS")));
    }

    #[test]
    fn region_attributes_must_exist() {
        let spec = RegionSpec { attribute: "district".into(), weight: None };
        assert!(matches!(builder().regions(spec).build(), Err(PipelineError::Config(_))));

        let spec = RegionSpec { attribute: "region".into(), weight: Some("pop".into()) };
        assert!(builder().regions(spec).build().is_err());

        let spec = RegionSpec { attribute: "region".into(), weight: Some("population".into()) };
        assert!(builder().regions(spec).build().is_ok());
    }
}

// ── End to end ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod run {
    use acc_core::{AccessConfig, Coord, CostUnit, WeightAttribute};
    use acc_matrix::CancelToken;

    use super::fixtures::{builder, builder_with, close, config, flat_walk, F};
    use crate::{AccessClass, NoopObserver, PipelineObserver, RegionSpec, RunReport, RunStatus, Stage};

    fn run(b: crate::PipelineBuilder) -> RunReport {
        b.build().unwrap().run(&mut NoopObserver, &CancelToken::new()).unwrap()
    }

    fn v(report: &RunReport, origin: &str, column: &str) -> f64 {
        report.value(origin, column).unwrap().unwrap()
    }

    #[test]
    fn column_layout() {
        let p = builder().straight_line(true).build().unwrap();
        assert_eq!(
            p.schema().value_columns,
            [
                "hospital-1st", "hospital-2nd", "school-1st", "school-2nd",
                "walk-leg",
                "hospital-mm-1st", "hospital-mm-2nd", "school-mm-1st", "school-mm-2nd",
                "hospital-straight", "school-straight",
                "composite",
            ]
        );
    }

    #[test]
    fn drive_ranks_per_category() {
        let r = run(builder());
        assert_eq!(r.status, RunStatus::Completed);
        assert_eq!(r.unit, CostUnit::Seconds);
        // o1 on A: C at 300 m, D at 600 m, B at 100 m, 20 km/h.
        assert!(close(v(&r, "o1", "hospital-1st"), 54.0));
        assert!(close(v(&r, "o1", "hospital-2nd"), 108.0));
        assert!(close(v(&r, "o1", "school-1st"), 18.0));
        assert_eq!(v(&r, "o1", "school-2nd"), F);
        // o2 on B: the school node itself.
        assert_eq!(v(&r, "o2", "school-1st"), 0.0);
        assert!(close(v(&r, "o2", "hospital-1st"), 36.0));
    }

    #[test]
    fn walk_leg_and_multimodal() {
        let r = run(builder());
        assert_eq!(v(&r, "o1", "walk-leg"), 0.0);
        assert!(close(v(&r, "o1", "hospital-mm-1st"), 54.0));

        let walk = flat_walk(50.0);
        assert!(close(v(&r, "o2", "walk-leg"), walk));
        assert!(close(v(&r, "o2", "hospital-mm-1st"), 36.0 + walk));
        assert!(close(v(&r, "o2", "school-mm-1st"), walk));
        assert_eq!(v(&r, "o2", "school-mm-2nd"), F);
    }

    #[test]
    fn unreachable_and_snap_failure_are_distinct() {
        let r = run(builder());
        // o3 snapped to the isolated node: every facility is the fail value.
        assert_eq!(v(&r, "o3", "hospital-1st"), F);
        assert_eq!(v(&r, "o3", "hospital-mm-1st"), F);
        assert_eq!(v(&r, "o3", "composite"), F);
        assert!(close(v(&r, "o3", "walk-leg"), flat_walk(10.0)));
        // o4 is beyond the snap tolerance: missing, not fail.
        assert_eq!(r.value("o4", "hospital-1st"), Some(None));
        assert_eq!(r.origin_snap_failures, 1);
        assert_eq!(r.facility_snap_failures, [("hospital".to_owned(), 0), ("school".to_owned(), 0)]);
    }

    #[test]
    fn composite_and_classes() {
        let r = run(builder());
        assert!(close(v(&r, "o1", "composite"), (54.0 + 18.0) / 2.0));
        let class = |id: &str| {
            r.records.iter().find(|rec| rec.origin_id == id).unwrap().scores.as_ref().map(|s| s.class)
        };
        assert_eq!(class("o1"), Some(AccessClass::High));
        assert_eq!(class("o2"), Some(AccessClass::NoAccess));
        assert_eq!(class("o3"), Some(AccessClass::NoAccess));
        assert_eq!(class("o4"), None);
    }

    #[test]
    fn minutes_keep_the_sentinel() {
        let cfg = AccessConfig { report_minutes: true, ..config() };
        let r = run(builder_with(cfg));
        assert_eq!(r.unit, CostUnit::Minutes);
        assert!(close(v(&r, "o1", "hospital-1st"), 0.9));
        assert_eq!(v(&r, "o1", "school-2nd"), F);
        assert_eq!(v(&r, "o3", "composite"), F);
    }

    #[test]
    fn distance_weight_uses_offset_as_walk() {
        let cfg = AccessConfig { weight_attribute: WeightAttribute::Distance, ..config() };
        let r = run(builder_with(cfg));
        assert_eq!(r.unit, CostUnit::Metres);
        assert_eq!(v(&r, "o2", "walk-leg"), 50.0);
        assert_eq!(v(&r, "o2", "hospital-1st"), 200.0);
        assert_eq!(v(&r, "o2", "hospital-mm-1st"), 250.0);
        assert_eq!(r.missing_elevation, 0);
    }

    #[test]
    fn straight_line_distances() {
        let r = run(builder().straight_line(true));
        assert!(close(v(&r, "o2", "hospital-straight"), 200.0f64.hypot(50.0)));
        assert_eq!(v(&r, "o1", "school-straight"), 100.0);
    }

    #[test]
    fn composite_ignores_straight_line_columns() {
        let plain = run(builder());
        let with_straight = run(builder().straight_line(true));
        for origin in ["o1", "o2", "o3"] {
            assert_eq!(v(&plain, origin, "composite"), v(&with_straight, origin, "composite"));
        }
        let mm = v(&with_straight, "o2", "hospital-mm-1st") + v(&with_straight, "o2", "school-mm-1st");
        assert!(close(v(&with_straight, "o2", "composite"), mm / 2.0));
    }

    #[test]
    fn elevation_drives_the_walk_leg() {
        // o2 sits 2.5 m above B: a 5 % descent, Tobler's fastest grade.
        let terrain = |c: Coord| if c.y.abs() > 1.0 { Some(2.5) } else { Some(0.0) };
        let r = run(builder().elevation(terrain));
        assert!(v(&r, "o2", "walk-leg") < flat_walk(50.0));
        assert_eq!(r.missing_elevation, 0);

        let r = run(builder().elevation(|_: Coord| -> Option<f64> { None }));
        assert!(close(v(&r, "o2", "walk-leg"), flat_walk(50.0)));
        // o1, o2, o3 snapped; o1 has a zero-length leg but is still counted.
        assert_eq!(r.missing_elevation, 3);
    }

    #[test]
    fn retained_matrix() {
        let r = run(builder().retain_matrix(true));
        let od = r.od.unwrap();
        assert_eq!(od.n_origins(), 3);
        assert_eq!(od.n_destinations(), 3);
        assert_eq!(od.unit(), CostUnit::Seconds);
        assert!(run(builder()).od.is_none());
    }

    #[test]
    fn regional_summaries() {
        let spec = RegionSpec { attribute: "region".into(), weight: Some("population".into()) };
        let r = run(builder().regions(spec));
        assert_eq!(r.summaries.len(), 2);

        let north = &r.summaries[0];
        assert_eq!(north.region, "North");
        assert_eq!(north.origins, 2);
        assert_eq!(north.total_weight, 400.0);
        assert_eq!(north.reachable_weight, 400.0);
        let h1 = r.column_index("hospital-1st").unwrap();
        assert!(close(north.means[h1].unwrap(), (54.0 * 100.0 + 36.0 * 300.0) / 400.0));

        let south = &r.summaries[1];
        assert_eq!(south.region, "South");
        assert_eq!(south.total_weight, 75.0);
        assert_eq!(south.reachable_weight, 0.0);
        assert_eq!(south.snap_failed_weight, 25.0);
        assert_eq!(south.means[h1], None);
        let walk = r.column_index("walk-leg").unwrap();
        assert!(close(south.means[walk].unwrap(), flat_walk(10.0)));
    }

    #[derive(Default)]
    struct Recorder {
        stages: Vec<Stage>,
        last_rows: Option<(usize, usize)>,
        ended: bool,
    }

    impl PipelineObserver for Recorder {
        fn on_stage(&mut self, stage: Stage) {
            self.stages.push(stage);
        }
        fn on_rows(&mut self, done: usize, total: usize) {
            self.last_rows = Some((done, total));
        }
        fn on_run_end(&mut self, _report: &RunReport) {
            self.ended = true;
        }
    }

    #[test]
    fn observer_sees_every_stage() {
        let spec = RegionSpec { attribute: "region".into(), weight: None };
        let p = builder().regions(spec).build().unwrap();
        let mut obs = Recorder::default();
        p.run(&mut obs, &CancelToken::new()).unwrap();
        assert_eq!(obs.stages, [Stage::Snap, Stage::Costs, Stage::Assemble, Stage::Summaries]);
        assert_eq!(obs.last_rows, Some((3, 3)));
        assert!(obs.ended);
    }

    #[test]
    fn cancelled_run_has_no_records() {
        let p = builder().build().unwrap();
        let cancel = CancelToken::new();
        cancel.cancel();
        let mut obs = Recorder::default();
        let r = p.run(&mut obs, &cancel).unwrap();
        assert_eq!(r.status, RunStatus::Cancelled);
        assert_eq!(r.rows_computed, 0);
        assert!(r.records.is_empty());
        assert!(obs.ended);
        assert!(!obs.stages.contains(&Stage::Assemble));
    }
}

// ── Checkpoint and resume ─────────────────────────────────────────────────────

#[cfg(test)]
mod checkpoint {
    use std::path::Path;

    use acc_core::{AccessConfig, FailValue, WeightAttribute};
    use acc_matrix::CancelToken;
    use acc_output::{fingerprint_path, read_od_csv};

    use super::fixtures::{builder, builder_with, close, config};
    use crate::{NoopObserver, Pipeline, PipelineError, PipelineObserver, RunReport, RunStatus};

    fn run_on(pipeline: Pipeline) -> Result<RunReport, PipelineError> {
        pipeline.run(&mut NoopObserver, &CancelToken::new())
    }

    /// Write `body` as a checkpoint at `path` belonging to `pipeline`.
    fn seed(pipeline: &Pipeline, path: &Path, body: &str) {
        std::fs::write(path, body).unwrap();
        std::fs::write(fingerprint_path(path), pipeline.run_fingerprint()).unwrap();
    }

    #[test]
    fn fresh_run_writes_every_row() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("od.csv");
        let pipeline = builder().checkpoint(path.clone()).build().unwrap();
        let fingerprint = pipeline.run_fingerprint();
        let r = run_on(pipeline).unwrap();
        assert_eq!((r.rows_computed, r.rows_resumed), (3, 0));

        let od = read_od_csv(&path).unwrap();
        // Union of B (school), C and D (hospitals), by external id.
        assert_eq!(od.destinations, [2, 3, 4]);
        assert_eq!(od.rows.len(), 3);
        assert_eq!(od.rows[0].0, 1);
        assert_eq!(od.fingerprint, Some(fingerprint));
    }

    #[test]
    fn rerun_resumes_everything() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("od.csv");
        let first = run_on(builder().checkpoint(path.clone()).build().unwrap()).unwrap();
        let second = run_on(builder().checkpoint(path.clone()).build().unwrap()).unwrap();
        assert_eq!((second.rows_computed, second.rows_resumed), (0, 3));
        assert_eq!(first.records, second.records);
        assert_eq!(read_od_csv(&path).unwrap().rows.len(), 3);
    }

    #[test]
    fn resumed_rows_are_used_as_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("od.csv");
        let pipeline = builder().checkpoint(path.clone()).build().unwrap();
        // A partial trailing row is dropped on resume.
        seed(&pipeline, &path, "origin_node,2,3,4\n1,1,2,3\n2,0,3");

        let r = run_on(pipeline).unwrap();
        assert_eq!((r.rows_computed, r.rows_resumed), (2, 1));
        assert_eq!(r.value("o1", "school-1st"), Some(Some(1.0)));
        assert_eq!(r.value("o1", "hospital-1st"), Some(Some(2.0)));
        assert!(close(r.value("o2", "hospital-1st").unwrap().unwrap(), 36.0));

        let od = read_od_csv(&path).unwrap();
        let origins: Vec<i64> = od.rows.iter().map(|(o, _)| *o).collect();
        assert_eq!(origins, [1, 2, 5]);
    }

    #[test]
    fn cancel_then_resume() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("od.csv");
        let cancel = CancelToken::new();
        cancel.cancel();
        let r = builder().checkpoint(path.clone()).build().unwrap().run(&mut NoopObserver, &cancel).unwrap();
        assert_eq!(r.status, RunStatus::Cancelled);
        assert!(path.exists());

        let r = run_on(builder().checkpoint(path).build().unwrap()).unwrap();
        assert_eq!(r.status, RunStatus::Completed);
        assert_eq!((r.rows_computed, r.rows_resumed), (3, 0));
    }

    /// Cancels through a cloned handle on another thread once a row lands.
    struct CancelAfterFirstRow(CancelToken);

    impl PipelineObserver for CancelAfterFirstRow {
        fn on_rows(&mut self, done: usize, _total: usize) {
            if done >= 1 {
                let token = self.0.clone();
                std::thread::spawn(move || token.cancel()).join().unwrap();
            }
        }
    }

    #[test]
    fn cancelled_mid_run_then_resumed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("od.csv");
        let one_row_chunks = AccessConfig { chunk_rows: 1, ..config() };

        let cancel = CancelToken::new();
        let r = builder_with(one_row_chunks.clone())
            .checkpoint(path.clone())
            .build()
            .unwrap()
            .run(&mut CancelAfterFirstRow(cancel.clone()), &cancel)
            .unwrap();
        assert_eq!(r.status, RunStatus::Cancelled);
        assert_eq!(r.rows_computed, 1);
        assert!(r.records.is_empty());
        assert_eq!(read_od_csv(&path).unwrap().rows.len(), 1);

        let r = run_on(builder_with(one_row_chunks).checkpoint(path).build().unwrap()).unwrap();
        assert_eq!(r.status, RunStatus::Completed);
        assert_eq!((r.rows_computed, r.rows_resumed), (2, 1));
    }

    #[test]
    fn mismatched_destinations_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("od.csv");
        let pipeline = builder().checkpoint(path.clone()).build().unwrap();
        seed(&pipeline, &path, "origin_node,2,3\n1,18,54\n");
        let err = run_on(pipeline);
        assert!(matches!(err, Err(PipelineError::Checkpoint { message, .. }) if message.contains("destination")));
    }

    #[test]
    fn foreign_origin_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("od.csv");
        let pipeline = builder().checkpoint(path.clone()).build().unwrap();
        // Node 4 exists but no origin snaps to it.
        seed(&pipeline, &path, "origin_node,2,3,4\n4,90,54,0\n");
        let err = run_on(pipeline);
        assert!(matches!(err, Err(PipelineError::Checkpoint { message, .. }) if message.contains("node 4")));
    }

    #[test]
    fn time_rows_not_resumed_under_distance_weight() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("od.csv");
        let timed = run_on(builder().checkpoint(path.clone()).build().unwrap()).unwrap();
        assert!(close(timed.value("o1", "hospital-1st").unwrap().unwrap(), 54.0));

        let distance = AccessConfig { weight_attribute: WeightAttribute::Distance, ..config() };
        let err = run_on(builder_with(distance.clone()).checkpoint(path.clone()).build().unwrap());
        assert!(matches!(err, Err(PipelineError::Checkpoint { message, .. }) if message.contains("weight=time")));

        // Starting over under the new weight gives metres.
        std::fs::remove_file(&path).unwrap();
        let r = run_on(builder_with(distance).checkpoint(path).build().unwrap()).unwrap();
        assert_eq!(r.value("o1", "hospital-1st"), Some(Some(300.0)));
    }

    #[test]
    fn fail_value_and_cutoff_are_part_of_the_fingerprint() {
        let base = builder().build().unwrap().run_fingerprint();
        let fail = AccessConfig { fail_value: FailValue::new(1.0e12).unwrap(), ..config() };
        let cutoff = AccessConfig { max_search_distance: Some(250.0), ..config() };
        assert_eq!(base, builder().build().unwrap().run_fingerprint());
        assert_ne!(base, builder_with(fail).build().unwrap().run_fingerprint());
        assert_ne!(base, builder_with(cutoff).build().unwrap().run_fingerprint());
    }

    #[test]
    fn checkpoint_without_fingerprint_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("od.csv");
        std::fs::write(&path, "origin_node,2,3,4\n1,1,2,3\n").unwrap();
        let err = run_on(builder().checkpoint(path).build().unwrap());
        assert!(matches!(err, Err(PipelineError::Checkpoint { message, .. }) if message.contains("fingerprint")));
    }
}

// ── Writing reports ───────────────────────────────────────────────────────────

#[cfg(test)]
mod write {
    use acc_matrix::CancelToken;
    use acc_output::CsvWriter;

    use super::fixtures::builder;
    use crate::{NoopObserver, RegionSpec};

    #[test]
    fn csv_table_and_summary() {
        let dir = tempfile::tempdir().unwrap();
        let spec = RegionSpec { attribute: "region".into(), weight: Some("population".into()) };
        let r = builder().regions(spec).build().unwrap().run(&mut NoopObserver, &CancelToken::new()).unwrap();
        let mut w = CsvWriter::new(dir.path(), &r.schema).unwrap();
        r.write(&mut w).unwrap();

        let mut rdr = csv::Reader::from_path(dir.path().join("accessibility.csv")).unwrap();
        let header: Vec<String> = rdr.headers().unwrap().iter().map(str::to_owned).collect();
        assert_eq!(header.first().map(String::as_str), Some("origin_id"));
        assert_eq!(header.last().map(String::as_str), Some("access_class"));

        let rows: Vec<csv::StringRecord> = rdr.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 4);
        assert_eq!(&rows[0][header.len() - 1], "high accessibility");
        assert_eq!(&rows[2][1], "999999999");
        // Snap failure: every value and the class are empty.
        assert!(rows[3].iter().skip(1).all(str::is_empty));

        let summary = std::fs::read_to_string(dir.path().join("regional_summary.csv")).unwrap();
        assert_eq!(summary.lines().count(), 3);
    }
}

// ── Properties ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod properties {
    use acc_core::FailValue;
    use proptest::prelude::*;

    use crate::{combine, WalkModel};

    const F: f64 = 999_999_999.0;

    proptest! {
        #[test]
        fn walk_speed_within_bounds(incline in -5.0f64..5.0, floor in 0.05f64..3.0) {
            let m = WalkModel::new(6.0, floor);
            let s = m.speed_kmh(incline);
            prop_assert!(s >= floor && s <= 6.0);
        }

        #[test]
        fn combine_never_leaks_the_sentinel(walk in prop_oneof![Just(F), 0.0f64..1e5], drive in prop_oneof![Just(F), 0.0f64..1e6]) {
            let fail = FailValue::DEFAULT;
            let c = combine(walk, drive, fail);
            if walk == F || drive == F {
                prop_assert_eq!(c, F);
            } else {
                prop_assert_eq!(c, walk + drive);
            }
        }
    }
}
