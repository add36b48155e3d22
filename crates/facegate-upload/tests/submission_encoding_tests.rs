//! Integration tests for multipart submission encoding.

use facegate_core::{
    Credentials, LoginCredentials, PhotoPayload, RegistrationCredentials,
};
use facegate_upload::{PartValue, encode_submission};

fn login() -> Credentials {
    Credentials::Login(LoginCredentials::new("open sesame").expect("valid credentials"))
}

fn registration() -> Credentials {
    Credentials::Register(
        RegistrationCredentials::new("Ada", "Lovelace", "ada", "analytical engine")
            .expect("valid credentials"),
    )
}

fn photo() -> PhotoPayload {
    PhotoPayload::from_file("face.png", vec![0x89, b'P', b'N', b'G', 1, 2, 3])
        .expect("photo should build")
}

#[test]
fn submission_encoding_tests_login_without_photo_is_valid() {
    let payload = encode_submission(&login(), None);

    assert_eq!(payload.field_names(), vec!["pass_phrase"]);
    assert_eq!(payload.text_field("pass_phrase"), Some("open sesame"));
    assert_eq!(payload.file_part_count(), 0);
}

#[test]
fn submission_encoding_tests_login_with_photo_has_one_binary_part() {
    let photo = photo();
    let payload = encode_submission(&login(), Some(&photo));

    assert_eq!(payload.field_names(), vec!["pass_phrase", "photo"]);
    assert_eq!(payload.file_part_count(), 1);
    assert_eq!(
        payload.parts()[1].value,
        PartValue::File {
            file_name: "face.png".to_string(),
            content_type: "image/png".to_string(),
            len: 7,
        }
    );

    let header = "Content-Disposition: form-data; name=\"photo\"; filename=\"face.png\"\r\nContent-Type: image/png\r\n\r\n";
    let body = payload.body();
    let position = body
        .windows(header.len())
        .position(|window| window == header.as_bytes())
        .expect("photo header should be present");
    let content_start = position + header.len();
    assert_eq!(&body[content_start..content_start + 7], photo.bytes());
}

#[test]
fn submission_encoding_tests_register_carries_exactly_its_fields() {
    let photo = photo();
    let payload = encode_submission(&registration(), Some(&photo));

    assert_eq!(
        payload.field_names(),
        vec!["first_name", "last_name", "username", "pass_phrase", "photo"]
    );
    assert_eq!(payload.text_field("first_name"), Some("Ada"));
    assert_eq!(payload.text_field("last_name"), Some("Lovelace"));
    assert_eq!(payload.text_field("username"), Some("ada"));
    assert_eq!(payload.text_field("pass_phrase"), Some("analytical engine"));
    assert_eq!(payload.file_part_count(), 1);
}

#[test]
fn submission_encoding_tests_identical_inputs_are_byte_identical() {
    let photo = photo();
    let first = encode_submission(&registration(), Some(&photo));
    let second = encode_submission(&registration(), Some(&photo));
    assert_eq!(first, second);

    let other_photo =
        PhotoPayload::from_file("face.png", vec![0x89, b'P', b'N', b'G', 9, 9, 9])
            .expect("photo should build");
    let third = encode_submission(&registration(), Some(&other_photo));
    assert_ne!(first.boundary(), third.boundary());
}

#[test]
fn submission_encoding_tests_boundary_never_appears_in_content() {
    let first = encode_submission(&login(), None);
    let tricky = Credentials::Login(
        LoginCredentials::new(format!("x{}x", first.boundary())).expect("valid credentials"),
    );
    let payload = encode_submission(&tricky, None);

    let value = payload.text_field("pass_phrase").expect("field present");
    assert!(!value.contains(payload.boundary()));
}
