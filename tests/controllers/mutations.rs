use rstest::rstest;
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, ResponseTemplate};

use dbadmin::data_types::{Row, RowId};
use dbadmin::error::AdminError;

use super::ids;
use crate::fixtures::{bookings_columns, mount_hotel};
use crate::{test_admin, TestAdmin};

#[rstest]
#[tokio::test]
async fn test_insert_grows_table_by_one(#[future] test_admin: TestAdmin) {
    let admin = test_admin.await;
    Mock::given(method("GET"))
        .and(path("/api/tables/bookings/columns"))
        .respond_with(ResponseTemplate::new(200).set_body_json(bookings_columns()))
        .mount(&admin.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/tables/bookings/rows"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 3, "client_name": "Ann"},
            {"id": 5, "client_name": "Bob"}
        ])))
        .up_to_n_times(1)
        .mount(&admin.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/tables/bookings/rows"))
        .and(body_json(json!({"client_name": "Dee", "room_number": 12})))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&admin.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/tables/bookings/rows"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 3, "client_name": "Ann"},
            {"id": 5, "client_name": "Bob"},
            {"id": 6, "client_name": "Dee"}
        ])))
        .mount(&admin.server)
        .await;

    admin.tables.select_table("bookings").await.unwrap();
    let before = ids(&admin.tables.snapshot());
    assert_eq!(before.len(), 2);

    let fields: Row = json!({"clientName": "Dee", "roomNumber": 12})
        .as_object()
        .unwrap()
        .clone();
    admin.tables.insert_row(&fields).await.unwrap();

    let after = ids(&admin.tables.snapshot());
    assert_eq!(after.len(), 3);
    assert!(before.iter().all(|id| after.contains(id)));
}

#[rstest]
#[tokio::test]
async fn test_delete_removes_only_that_row(#[future] test_admin: TestAdmin) {
    let admin = test_admin.await;
    mount_hotel(&admin.server).await;
    Mock::given(method("DELETE"))
        .and(path("/api/tables/bookings/5"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&admin.server)
        .await;

    admin.tables.select_table("bookings").await.unwrap();
    admin.tables.delete_row_by_id(&RowId::Int(5)).await.unwrap();

    assert_eq!(ids(&admin.tables.snapshot()), vec![3, 9]);
}

#[rstest]
#[tokio::test]
async fn test_edit_changes_only_that_cell(#[future] test_admin: TestAdmin) {
    let admin = test_admin.await;
    mount_hotel(&admin.server).await;
    Mock::given(method("PUT"))
        .and(path("/api/tables/bookings/5"))
        .and(body_json(json!({
            "id": 5,
            "client_name": "Bob",
            "room_number": 204,
            "email": "a@b.com",
            "is_active": false
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&admin.server)
        .await;

    admin.tables.select_table("bookings").await.unwrap();
    let before = admin.tables.snapshot();

    admin
        .tables
        .edit_cell(&RowId::Int(5), "email", json!("a@b.com"))
        .await
        .unwrap();

    let after = admin.tables.snapshot();
    assert_eq!(after.rows[1]["email"], json!("a@b.com"));
    for (key, value) in &before.rows[1] {
        if key != "email" {
            assert_eq!(&after.rows[1][key], value);
        }
    }
    assert_eq!(after.rows[0], before.rows[0]);
    assert_eq!(after.rows[2], before.rows[2]);
}

#[rstest]
#[tokio::test]
async fn test_edit_unknown_row(#[future] test_admin: TestAdmin) {
    let admin = test_admin.await;
    mount_hotel(&admin.server).await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&admin.server)
        .await;

    admin.tables.select_table("bookings").await.unwrap();
    let err = admin
        .tables
        .edit_cell(&RowId::Int(42), "email", json!("x@y.z"))
        .await
        .unwrap_err();

    assert!(matches!(err, AdminError::RowNotFound { .. }));
}
