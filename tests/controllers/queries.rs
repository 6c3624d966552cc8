use rstest::rstest;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use dbadmin::data_types::{ColumnDescriptor, RowId, TableSnapshot};
use dbadmin::error::AdminError;
use dbadmin::state::View;

use crate::fixtures::mount_hotel;
use crate::{test_admin, TestAdmin};

#[rstest]
#[case::no_name("", "SELECT 1")]
#[case::no_query("t", "")]
#[case::blank_name("   ", "SELECT 1")]
#[tokio::test]
async fn test_save_template_rejects_without_network(
    #[future] test_admin: TestAdmin,
    #[case] name: &str,
    #[case] sql: &str,
) {
    let admin = test_admin.await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&admin.server)
        .await;

    let err = admin.templates.save_template(name, sql).await.unwrap_err();
    assert!(matches!(err, AdminError::Validation { .. }));
    assert_eq!(admin.templates.revision().current(), 0);
}

#[rstest]
#[tokio::test]
async fn test_run_all_active_against_bookings(#[future] test_admin: TestAdmin) {
    let admin = test_admin.await;
    mount_hotel(&admin.server).await;
    admin.tables.select_table("bookings").await.unwrap();

    let names = admin.templates.list_templates().await.unwrap();
    assert_eq!(names, vec!["all_active"]);

    let result = admin
        .templates
        .run_template("all_active", "bookings")
        .await
        .unwrap();

    let expected = TableSnapshot {
        columns: vec![
            ColumnDescriptor::new("id", "integer"),
            ColumnDescriptor::new("clientName", "text"),
        ],
        rows: vec![
            json!({"id": 3, "clientName": "Ann"}).as_object().unwrap().clone(),
            json!({"id": 9, "clientName": "Cid"}).as_object().unwrap().clone(),
        ],
    };
    assert_eq!(result, expected);
    assert_eq!(admin.tables.view(), View::QueryResult(expected));

    // Query rows are display-only
    let err = admin
        .tables
        .delete_row_by_id(&RowId::Int(3))
        .await
        .unwrap_err();
    assert!(matches!(err, AdminError::Validation { .. }));

    admin.tables.show_table_view();
    assert_eq!(admin.tables.view().snapshot().rows.len(), 3);
}

#[rstest]
#[tokio::test]
async fn test_saved_template_shows_up_in_listing(#[future] test_admin: TestAdmin) {
    let admin = test_admin.await;
    Mock::given(method("GET"))
        .and(path("/api/database/sql-options"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .up_to_n_times(1)
        .expect(1)
        .mount(&admin.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/database/sql-options"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&admin.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/database/sql-options"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"name": "by_room", "query": "SELECT * FROM bookings ORDER BY room_number"}
        ])))
        .mount(&admin.server)
        .await;

    assert!(admin.templates.list_templates().await.unwrap().is_empty());
    // Cached until something changes
    assert!(admin.templates.list_templates().await.unwrap().is_empty());

    admin
        .templates
        .save_template("by_room", "SELECT * FROM bookings ORDER BY room_number")
        .await
        .unwrap();

    assert_eq!(admin.templates.list_templates().await.unwrap(), vec!["by_room"]);
}
