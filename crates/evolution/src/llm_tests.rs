// SPDX-License-Identifier: MIT

use super::*;

fn ctx() -> WorldContext {
    WorldContext { entity_count: 100, avg_energy: 40.0, resource_count: 50, death_stats: HashMap::new() }
}

#[test]
fn plan_response_requires_all_fields() {
    let complete = PlanResponse {
        trait_name: "energy_saver".to_string(),
        description: "reduce metabolism".to_string(),
        action_type: "new_trait".to_string(),
    };
    assert!(complete.is_complete());

    let missing = PlanResponse {
        trait_name: String::new(),
        description: "reduce metabolism".to_string(),
        action_type: "new_trait".to_string(),
    };
    assert!(!missing.is_complete());
}

#[tokio::test]
async fn fake_llm_client_pops_queued_plans_in_order() {
    let client = FakeLlmClient::new();
    client.queue_plan(Ok(PlanResponse {
        trait_name: "a".to_string(),
        description: "d".to_string(),
        action_type: "new_trait".to_string(),
    }));
    client.queue_plan(Err(LlmError::Timeout));

    let request = PlanRequest {
        problem_type: "starvation".to_string(),
        severity: "high".to_string(),
        affected_entities: 100,
        suggested_area: None,
        world_context: ctx(),
    };

    let first = client.propose_plan(request.clone()).await.unwrap();
    assert_eq!(first.trait_name, "a");

    let second = client.propose_plan(request).await;
    assert!(matches!(second, Err(LlmError::Timeout)));
}

#[tokio::test]
async fn fake_llm_client_errors_loudly_when_queue_is_empty() {
    let client = FakeLlmClient::new();
    let result = client
        .generate_code(CodeRequest {
            trait_name: "a".to_string(),
            description: "d".to_string(),
            action_type: "new_trait".to_string(),
            retry_guidance: None,
        })
        .await;
    assert!(matches!(result, Err(LlmError::Transport(_))));
}
