//! Search flow tests: validation, scopes, result shaping and error mapping.

use ds_search::{execute, AttrsInput, SearchError, SearchParameters, SearchRecords, SearchScope};
use serde_json::json;

use crate::common::{init_tracing, CountingFactory};

#[tokio::test]
async fn onelevel_groups_collapse_single_values() -> anyhow::Result<()> {
    init_tracing();
    let mut factory = CountingFactory::sample();

    let params = SearchParameters::new("ou=groups,dc=example,dc=com")
        .scope("onelevel")
        .attrs("gidNumber");
    let outcome = execute(&params, &mut factory).await?;

    assert!(outcome.executed);
    assert_eq!(outcome.count, 2);
    assert_eq!(
        serde_json::to_value(&outcome)?,
        json!({
            "executed": true,
            "count": 2,
            "results": [
                {"dn": "cn=admins,ou=groups,dc=example,dc=com", "gidNumber": "5000"},
                {"dn": "cn=users,ou=groups,dc=example,dc=com", "gidNumber": "5001"}
            ]
        })
    );
    Ok(())
}

#[tokio::test]
async fn multi_valued_attributes_stay_lists() -> anyhow::Result<()> {
    let mut factory = CountingFactory::sample();

    let params = SearchParameters::new("cn=admins,ou=groups,dc=example,dc=com")
        .attrs(AttrsInput::names(["memberUid", "cn"]));
    let outcome = execute(&params, &mut factory).await?;

    let value = serde_json::to_value(&outcome.results)?;
    assert_eq!(
        value,
        json!([{
            "dn": "cn=admins,ou=groups,dc=example,dc=com",
            "cn": "admins",
            "memberUid": ["alice", "bob"]
        }])
    );
    Ok(())
}

#[tokio::test]
async fn missing_base_reports_the_requested_dn() {
    let mut factory = CountingFactory::sample();

    let params = SearchParameters::new("ou=missing,dc=example,dc=com").scope("onelevel");
    let err = execute(&params, &mut factory).await.unwrap_err();

    match err {
        SearchError::SearchBaseNotFound(dn) => assert_eq!(dn, "ou=missing,dc=example,dc=com"),
        other => panic!("expected SearchBaseNotFound, got {other:?}"),
    }
    assert_eq!(factory.connects, 1);
}

#[tokio::test]
async fn schema_mode_lists_attribute_names() -> anyhow::Result<()> {
    let mut factory = CountingFactory::sample();

    let params = SearchParameters::new("cn=users,ou=groups,dc=example,dc=com")
        .attrs("gidNumber")
        .schema(true);
    let outcome = execute(&params, &mut factory).await?;

    let SearchRecords::Schema(records) = &outcome.results else {
        panic!("expected schema records");
    };
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].attrs, vec!["objectClass", "cn", "gidNumber"]);

    let request = &factory.directory.requests[0];
    assert!(request.types_only());
    Ok(())
}

#[tokio::test]
async fn schema_flag_accepts_string_forms() -> anyhow::Result<()> {
    let mut factory = CountingFactory::sample();

    let params: SearchParameters = serde_json::from_value(json!({
        "dn": "dc=example,dc=com",
        "schema": "yes"
    }))?;
    let outcome = execute(&params, &mut factory).await?;

    assert!(matches!(outcome.results, SearchRecords::Schema(_)));
    Ok(())
}

#[tokio::test]
async fn subordinate_scope_excludes_the_base() -> anyhow::Result<()> {
    let mut factory = CountingFactory::sample();

    let params = SearchParameters::new("ou=groups,dc=example,dc=com").scope("subordinate");
    let outcome = execute(&params, &mut factory).await?;

    assert_eq!(
        outcome.results.dns(),
        vec![
            "cn=admins,ou=groups,dc=example,dc=com",
            "cn=users,ou=groups,dc=example,dc=com"
        ]
    );
    assert_eq!(factory.directory.requests[0].scope, SearchScope::Subordinate);
    Ok(())
}

#[tokio::test]
async fn children_scope_includes_the_base() -> anyhow::Result<()> {
    let mut factory = CountingFactory::sample();

    let params = SearchParameters::new("ou=groups,dc=example,dc=com").scope("children");
    let outcome = execute(&params, &mut factory).await?;

    assert_eq!(outcome.count, 3);
    assert_eq!(outcome.results.dns()[0], "ou=groups,dc=example,dc=com");
    Ok(())
}

#[tokio::test]
async fn filter_narrows_results() -> anyhow::Result<()> {
    let mut factory = CountingFactory::sample();

    let params = SearchParameters::new("dc=example,dc=com")
        .scope("children")
        .filter("(gidNumber=5001)");
    let outcome = execute(&params, &mut factory).await?;

    assert_eq!(outcome.results.dns(), vec!["cn=users,ou=groups,dc=example,dc=com"]);
    Ok(())
}

#[tokio::test]
async fn empty_result_is_still_executed() -> anyhow::Result<()> {
    let mut factory = CountingFactory::sample();

    let params = SearchParameters::new("dc=example,dc=com")
        .scope("children")
        .filter("(uid=nobody)");
    let outcome = execute(&params, &mut factory).await?;

    assert!(outcome.executed);
    assert_eq!(outcome.count, 0);
    assert_eq!(serde_json::to_value(&outcome.results)?, json!([]));
    Ok(())
}

#[tokio::test]
async fn binary_values_render_as_base64() -> anyhow::Result<()> {
    let mut factory = CountingFactory::sample();

    let params = SearchParameters::new("uid=alice,ou=people,dc=example,dc=com")
        .attrs("uid,jpegPhoto");
    let outcome = execute(&params, &mut factory).await?;

    let value = serde_json::to_value(&outcome.results)?;
    assert_eq!(value[0]["uid"], json!("alice"));
    assert_eq!(value[0]["jpegPhoto"], json!("/9j/4A=="));
    Ok(())
}

#[tokio::test]
async fn invalid_input_never_connects() {
    let mut factory = CountingFactory::sample();

    let bad_scope = SearchParameters::new("dc=example,dc=com").scope("sub");
    let err = execute(&bad_scope, &mut factory).await.unwrap_err();
    assert!(matches!(err, SearchError::InvalidScope(ref s) if s == "sub"));

    let bad_attrs: SearchParameters = serde_json::from_value(json!({
        "dn": "dc=example,dc=com",
        "attrs": ["cn", 7]
    }))
    .unwrap();
    let err = execute(&bad_attrs, &mut factory).await.unwrap_err();
    assert!(matches!(err, SearchError::InvalidAttributeList(_)));

    let bad_schema = SearchParameters {
        schema: ds_search::Flag::Text("perhaps".to_string()),
        ..SearchParameters::new("dc=example,dc=com")
    };
    let err = execute(&bad_schema, &mut factory).await.unwrap_err();
    assert!(err.is_validation_error());

    assert_eq!(factory.connects, 0);
    assert!(factory.directory.requests.is_empty());
}

#[tokio::test]
async fn exactly_one_search_per_execution() -> anyhow::Result<()> {
    let mut factory = CountingFactory::sample();

    let params = SearchParameters::new("dc=example,dc=com").scope("children");
    execute(&params, &mut factory).await?;

    assert_eq!(factory.connects, 1);
    assert_eq!(factory.directory.requests.len(), 1);
    Ok(())
}

#[tokio::test]
async fn csv_and_list_attributes_issue_the_same_request() -> anyhow::Result<()> {
    let mut csv = CountingFactory::sample();
    let mut list = CountingFactory::sample();

    execute(
        &SearchParameters::new("dc=example,dc=com").attrs(" cn , gidNumber "),
        &mut csv,
    )
    .await?;
    execute(
        &SearchParameters::new("dc=example,dc=com").attrs(AttrsInput::names(["cn", "gidNumber"])),
        &mut list,
    )
    .await?;

    assert_eq!(csv.directory.requests, list.directory.requests);
    Ok(())
}

#[tokio::test]
async fn connection_failure_propagates_diagnostic() {
    let mut factory = CountingFactory {
        refuse: Some("connection refused".to_string()),
        ..CountingFactory::sample()
    };

    let params = SearchParameters::new("dc=example,dc=com");
    let err = execute(&params, &mut factory).await.unwrap_err();

    assert!(err.is_connection_error());
    assert_eq!(err.diagnostic(), Some("connection refused"));
    assert!(factory.directory.requests.is_empty());
}
