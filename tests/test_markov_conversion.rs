#[cfg(test)]
mod test_markov_conversion {
    use bayesfactor::common::interface::ScenarioMaker;
    use bayesfactor::common::resources::ResourceContext;
    use bayesfactor::factor::Factor;
    use bayesfactor::network::NetworkDocument;
    use bayesfactor::scenarios::collider::Collider;
    use bayesfactor::table::{Storage, Value};

    fn collider_factors() -> (bayesfactor::BayesianNetwork, bayesfactor::MarkovNetwork) {
        let network = Collider {}
            .setup_scenario(&ResourceContext::new_in_memory())
            .unwrap();
        let markov_network = network.to_markov_network().unwrap();
        (network, markov_network)
    }

    #[test]
    fn test_collider_structure() {
        let (network, _) = collider_factors();
        assert_eq!(network.get_parents("Z"), vec!["X".to_string(), "Y".to_string()]);
        assert!(network.get_children("X").contains(&"Z".to_string()));
        assert!(network.get_children("Y").contains(&"Z".to_string()));
        assert_eq!(network.get_children("Z"), &["A".to_string()]);
    }

    #[test]
    fn test_one_factor_per_cpt() {
        let (_, markov_network) = collider_factors();
        assert_eq!(markov_network.get_factors(None).unwrap().len(), 4);
        assert_eq!(
            markov_network.get_variables(),
            vec!["A".to_string(), "X".to_string(), "Y".to_string(), "Z".to_string()]
        );
    }

    #[test]
    fn test_three_cpt_chain_gives_three_factors() {
        let document = NetworkDocument::from_json(
            r#"{
                "priors": { "X": [[0, 0.7], [1, 0.3]] },
                "cpts": [
                    { "outcome": "Z", "givens": ["X", "Y"], "rows": [
                        { "X": 0, "Y": 0, "Z": 1, "value": 0.1 },
                        { "X": 0, "Y": 1, "Z": 1, "value": 0.6 },
                        { "X": 1, "Y": 0, "Z": 1, "value": 0.7 },
                        { "X": 1, "Y": 1, "Z": 1, "value": 0.95 }
                    ]},
                    { "outcome": "A", "givens": ["Z"], "rows": [
                        { "Z": 0, "A": 1, "value": 0.2 },
                        { "Z": 1, "A": 1, "value": 0.9 }
                    ]}
                ]
            }"#,
        )
        .unwrap();
        let network = document.into_network(&Storage::in_memory()).unwrap();
        assert_eq!(network.len(), 3);
        assert_eq!(network.get_parents("Z"), vec!["X".to_string(), "Y".to_string()]);

        let markov_network = network.to_markov_network().unwrap();
        assert_eq!(markov_network.get_factors(None).unwrap().len(), 3);

        let z_factors = markov_network.get_factors(Some("Z")).unwrap();
        assert_eq!(z_factors.len(), 2);
        assert!(z_factors.iter().any(|f| f.has_variable("A")));
        assert!(z_factors.iter().any(|f| f.has_variable("Y")));
    }

    #[test]
    fn test_factors_for_shared_variable() {
        let (_, markov_network) = collider_factors();
        let z_factors: Vec<Factor> = markov_network
            .get_factors(Some("Z"))
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(z_factors.len(), 2);

        let mut scopes: Vec<Vec<String>> = z_factors
            .iter()
            .map(|f| f.get_variables().into_iter().collect())
            .collect();
        scopes.sort();
        assert_eq!(
            scopes,
            vec![
                vec!["A".to_string(), "Z".to_string()],
                vec!["X".to_string(), "Y".to_string(), "Z".to_string()],
            ]
        );

        let a_factors = markov_network.get_factors(Some("A")).unwrap();
        let shared = a_factors.iter().next().unwrap();
        assert!(z_factors.iter().any(|f| f.same_as(shared)));
    }

    #[test]
    fn test_marginal_of_collider_child() {
        let (_, markov_network) = collider_factors();
        let joint = markov_network.get_factors(None).unwrap().prod().unwrap().unwrap();
        let marginal = joint.sum_out(&["A", "X", "Y"]).unwrap().get_df().unwrap();
        let p_z = marginal.weight_where(&[("Z", Value::from(1))]).unwrap();
        // 0.7*0.4*0.1 + 0.7*0.6*0.6 + 0.3*0.4*0.7 + 0.3*0.6*0.95
        assert!((p_z - 0.535).abs() < 1e-9);
        let total: f64 = marginal.weights().unwrap().iter().sum();
        assert!((total - 1.0).abs() < 1e-9);
    }
}
