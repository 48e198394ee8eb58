use hyperstudy::distribution::{
    DiscreteUniformDistribution, Distribution, distribution_from_json, distribution_to_json,
};
use hyperstudy::{Error, ParamValue};

#[test]
fn discrete_uniform_contains_checks_the_closed_range() {
    let d = Distribution::discrete_uniform(0.5, 5.5, 0.5).unwrap();
    assert!(d.contains(3.5));
    assert!(d.contains(0.5));
    assert!(d.contains(5.5));
    assert!(!d.contains(-3.0));
    assert!(!d.contains(15.0));
}

#[test]
fn discrete_uniform_snaps_to_grid() {
    let d = DiscreteUniformDistribution {
        low: 0.0,
        high: 10.0,
        q: 0.05,
    };
    assert!((d.quantize(3.52) - 3.5).abs() < 1e-9);
    assert!((d.quantize(3.53) - 3.55).abs() < 1e-9);
    assert!((d.quantize(42.0) - 10.0).abs() < 1e-9);
    assert!((d.quantize(-1.0) - 0.0).abs() < 1e-9);
}

#[test]
fn discrete_uniform_quantizes_from_its_lower_bound() {
    let d = DiscreteUniformDistribution {
        low: 0.5,
        high: 5.5,
        q: 0.05,
    };
    assert!((d.quantize(3.52) - 3.5).abs() < 1e-9);
    let d = Distribution::DiscreteUniform(d);
    let ir = d.to_internal_repr(&ParamValue::Float(3.52)).unwrap();
    assert!((ir - 3.5).abs() < 1e-9);
    assert!(d.contains(ir));
}

#[test]
fn discrete_uniform_contains_ignores_the_grid() {
    let d = Distribution::discrete_uniform(0.5, 3.5, 1.0).unwrap();
    assert!(d.contains(3.0));
    assert_eq!(d.to_internal_repr(&ParamValue::Float(3.0)).unwrap(), 3.5);
}

#[test]
fn categorical_external_repr_is_the_label() {
    let d = Distribution::categorical(["a", "b", "c"]).unwrap();
    assert_eq!(d.to_external_repr(2.0), ParamValue::Categorical("c".into()));
    assert_eq!(d.to_internal_repr(&"b".into()).unwrap(), 1.0);
    assert!(d.contains(0.0));
    assert!(!d.contains(1.5));
    assert!(!d.contains(3.0));
    assert!(matches!(
        d.to_internal_repr(&"z".into()),
        Err(Error::IncompatibleValue(_))
    ));
}

#[test]
fn int_uniform_rounds_external_values() {
    let d = Distribution::int_uniform(-3, 3).unwrap();
    assert_eq!(d.to_external_repr(1.6), ParamValue::Int(2));
    assert_eq!(d.to_external_repr(9.0), ParamValue::Int(3));
    assert_eq!(d.to_internal_repr(&ParamValue::Int(-2)).unwrap(), -2.0);
}

#[test]
fn single_distributions() {
    assert!(Distribution::uniform(1.0, 1.0).unwrap().single());
    assert!(!Distribution::uniform(1.0, 1.5).unwrap().single());
    assert!(Distribution::log_uniform(2.0, 2.0).unwrap().single());
    assert!(Distribution::int_uniform(4, 4).unwrap().single());
    assert!(!Distribution::int_uniform(4, 5).unwrap().single());
    // The range is narrower than one step, so only `low` is reachable.
    assert!(
        Distribution::discrete_uniform(0.0, 0.3, 0.5)
            .unwrap()
            .single()
    );
    assert!(Distribution::categorical(["only"]).unwrap().single());
    assert!(!Distribution::categorical(["a", "b"]).unwrap().single());
}

#[test]
fn constructors_validate() {
    assert!(matches!(
        Distribution::uniform(2.0, 1.0),
        Err(Error::InvalidBounds { .. })
    ));
    assert!(matches!(
        Distribution::log_uniform(0.0, 1.0),
        Err(Error::InvalidLogBounds)
    ));
    assert!(matches!(
        Distribution::discrete_uniform(0.0, 1.0, 0.0),
        Err(Error::InvalidStep)
    ));
    assert!(matches!(
        Distribution::categorical(Vec::<String>::new()),
        Err(Error::EmptyChoices)
    ));
}

#[test]
fn json_uses_kind_and_attributes() {
    let d = Distribution::categorical(["adam", "sgd"]).unwrap();
    let json = distribution_to_json(&d).unwrap();
    assert_eq!(
        json,
        r#"{"kind":"categorical","attributes":{"choices":["adam","sgd"]}}"#
    );

    let parsed =
        distribution_from_json(r#"{"kind":"intuniform","attributes":{"low":1,"high":8}}"#)
            .unwrap();
    assert_eq!(parsed, Distribution::int_uniform(1, 8).unwrap());
}

#[test]
fn json_round_trips_every_kind() {
    let cases = [
        (
            Distribution::uniform(-5.0, 10.0).unwrap(),
            r#"{"kind":"uniform","attributes":{"low":-5.0,"high":10.0}}"#,
        ),
        (
            Distribution::log_uniform(1e-4, 1.0).unwrap(),
            r#"{"kind":"loguniform","attributes":{"low":0.0001,"high":1.0}}"#,
        ),
        (
            Distribution::int_uniform(-3, 12).unwrap(),
            r#"{"kind":"intuniform","attributes":{"low":-3,"high":12}}"#,
        ),
        (
            Distribution::discrete_uniform(0.5, 5.5, 0.5).unwrap(),
            r#"{"kind":"discreteuniform","attributes":{"low":0.5,"high":5.5,"q":0.5}}"#,
        ),
        (
            Distribution::categorical(["relu", "tanh"]).unwrap(),
            r#"{"kind":"categorical","attributes":{"choices":["relu","tanh"]}}"#,
        ),
    ];
    for (distribution, json) in cases {
        assert_eq!(distribution_from_json(json).unwrap(), distribution, "{json}");
        let written = distribution_to_json(&distribution).unwrap();
        assert_eq!(distribution_from_json(&written).unwrap(), distribution);
    }
}

#[test]
fn external_values_map_back_inside_the_domain() {
    let cases = [
        (Distribution::uniform(-5.0, 10.0).unwrap(), 0.3),
        (Distribution::log_uniform(1e-4, 1.0).unwrap(), 0.01),
        (Distribution::int_uniform(-3, 12).unwrap(), 7.0),
        (Distribution::discrete_uniform(0.5, 5.5, 0.5).unwrap(), 2.5),
        (Distribution::categorical(["relu", "tanh", "gelu"]).unwrap(), 1.0),
    ];
    for (distribution, ir) in cases {
        assert!(distribution.contains(ir), "{} {ir}", distribution.kind());
        let external = distribution.to_external_repr(ir);
        let back = distribution.to_internal_repr(&external).unwrap();
        assert!(distribution.contains(back), "{} {back}", distribution.kind());
        assert!((back - ir).abs() < 1e-12, "{} {ir} -> {back}", distribution.kind());
    }
}

#[test]
fn json_rejects_unknown_and_invalid_input() {
    assert!(matches!(
        distribution_from_json(r#"{"kind":"normal","attributes":{"mu":0.0}}"#),
        Err(Error::UnknownDistributionKind(kind)) if kind == "normal"
    ));
    assert!(matches!(
        distribution_from_json(r#"{"kind":"uniform","attributes":{"low":3.0,"high":1.0}}"#),
        Err(Error::InvalidDistribution(_))
    ));
    assert!(matches!(
        distribution_from_json("not json"),
        Err(Error::InvalidDistribution(_))
    ));
}

#[test]
fn compatibility_ignores_numeric_bounds() {
    let a = Distribution::uniform(0.0, 1.0).unwrap();
    let b = Distribution::uniform(-5.0, 5.0).unwrap();
    let c = Distribution::int_uniform(0, 1).unwrap();
    assert!(a.is_compatible_with(&b));
    assert!(!a.is_compatible_with(&c));

    let x = Distribution::categorical(["a", "b"]).unwrap();
    let y = Distribution::categorical(["b", "a"]).unwrap();
    assert!(!x.is_compatible_with(&y));
}
