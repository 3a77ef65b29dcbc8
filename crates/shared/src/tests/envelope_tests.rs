use super::*;
use crate::error::{EMPTY_RESPONSE_MESSAGE, UNKNOWN};

#[derive(Debug, Clone, PartialEq, Deserialize)]
struct Article {
    id: i64,
    title: String,
}

#[test]
fn decodes_envelope_with_msg_alias() {
    let envelope: ResponseEnvelope<Article> = serde_json::from_str(
        r#"{"code":0,"msg":"ok","data":{"id":7,"title":"hello"}}"#,
    )
    .expect("decode");

    assert_eq!(envelope.message.as_deref(), Some("ok"));
    assert_eq!(
        resolve(Some(envelope)).expect("success"),
        Some(Article {
            id: 7,
            title: "hello".into()
        })
    );
}

#[test]
fn missing_fields_decode_as_none() {
    let envelope: ResponseEnvelope<Article> = serde_json::from_str("{}").expect("decode");
    assert_eq!(envelope.code, None);
    assert_eq!(envelope.data, None);
}

#[test]
fn null_envelope_resolves_to_empty_response_failure() {
    let failure = resolve::<ResponseEnvelope<Article>>(None).expect_err("failure");
    assert_eq!(failure.code, UNKNOWN);
    assert_eq!(failure.message.as_deref(), Some(EMPTY_RESPONSE_MESSAGE));
}

#[test]
fn error_code_is_passed_through_verbatim() {
    let failure = resolve(Some(ResponseEnvelope::<Article>::error(4003, "forbidden")))
        .expect_err("failure");
    assert_eq!(failure, Failure::new(4003, Some("forbidden".into())));
}

#[test]
fn envelope_without_code_is_not_success() {
    let envelope = ResponseEnvelope {
        code: None,
        message: None,
        data: Some(1),
    };
    assert!(!envelope.is_success());
    assert_eq!(resolve(Some(envelope)).expect_err("failure").code, UNKNOWN);
}

#[test]
fn success_without_data_resolves_to_none() {
    let envelope = ResponseEnvelope::<Article> {
        code: Some(200),
        message: None,
        data: None,
    };
    assert_eq!(resolve(Some(envelope)).expect("success"), None);
}

#[test]
fn page_envelope_decodes_page_count_and_skips_null_items() {
    let envelope: PageEnvelope<Article> = serde_json::from_str(
        r#"{"code":200,"data":[{"id":1,"title":"a"},null,{"id":2,"title":"b"}],"total":12,"index":2,"pageCount":4}"#,
    )
    .expect("decode");

    let page = resolve_page(Some(envelope)).expect("page");
    assert_eq!(page.items.len(), 2);
    assert_eq!((page.total, page.index, page.pages), (12, 2, 4));
}

#[test]
fn page_envelope_accepts_pages_alias_and_missing_list() {
    let envelope: PageEnvelope<Article> =
        serde_json::from_str(r#"{"code":0,"pages":3}"#).expect("decode");
    let page = resolve_page(Some(envelope)).expect("page");
    assert!(page.items.is_empty());
    assert_eq!(page.pages, 3);
}

#[test]
fn failed_page_envelope_reports_business_failure() {
    let envelope = PageEnvelope::<Article> {
        code: Some(500),
        message: Some("backend exploded".into()),
        data: None,
        total: 0,
        index: 0,
        page_count: 0,
    };
    let failure = resolve_page(Some(envelope)).expect_err("failure");
    assert_eq!(failure.code, 500);
}
