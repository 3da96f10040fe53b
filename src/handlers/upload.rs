//! 上传管道模块
//!
//! 解析 multipart 请求，把名为 `file` 的文件流式写入存储桶，
//! 再从存储键还原对象 ID 并写回文件描述，最后交给下游处理器。
//! 本模块自身不生成成功响应。

use crate::error::{ObjectIdError, UploadError};
use crate::file::{FormFields, UploadedFile};
use crate::handlers::constants::FILE_FIELD;
use crate::s3::StorageEngine;
use crate::s3::engine::FilePart;
use crate::utils::headers::is_multipart;
use crate::utils::key::object_id_from_key;
use axum::{
    Router,
    body::Body,
    extract::{DefaultBodyLimit, FromRequest, Multipart, Request, State},
    handler::Handler,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{MethodRouter, post},
};
use std::sync::Arc;

/// 为已上传的文件写入对象 ID。
///
/// 只有文件存在且存储键非空时才会写入，否则什么都不做。
/// 其余字段保持不变，同一个键重复调用得到相同的结果。
///
/// # 参数
///
/// * `file` - 请求中的文件描述，可能不存在。
///
/// # 返回值
///
/// 存储键的第一段不是合法对象 ID 时返回错误。
pub fn assign_object_id(file: Option<&mut UploadedFile>) -> Result<(), ObjectIdError> {
    let Some(file) = file else {
        return Ok(());
    };
    if file.key.is_empty() {
        return Ok(());
    }

    file.object_id = Some(object_id_from_key(&file.key)?);
    Ok(())
}

/// 上传中间件
///
/// 可以通过 `axum::middleware::from_fn_with_state` 挂到宿主自己的路由上。
/// 不是 multipart 的请求原样放行。上传成功后，下游处理器可以通过
/// `Extension<UploadedFile>` 和 `Extension<FormFields>` 读取结果。
pub async fn stream_upload(
    State(engine): State<Arc<StorageEngine>>,
    request: Request,
    next: Next,
) -> Response {
    match receive_file(&engine, request).await {
        Ok(request) => next.run(request).await,
        Err(err) => err.into_response(),
    }
}

async fn receive_file(engine: &StorageEngine, request: Request) -> Result<Request, UploadError> {
    if !is_multipart(request.headers()) {
        return Ok(request);
    }

    // 请求体交给 multipart 解析器，其余部分留给下游
    let (mut parts, body) = request.into_parts();
    let mut form = Request::new(body);
    *form.headers_mut() = parts.headers.clone();
    *form.extensions_mut() = parts.extensions.clone();
    let mut multipart = Multipart::from_request(form, &()).await?;

    let mut file = None;
    let mut fields = FormFields::default();

    // 表单读取失败时删除已经写入的文件
    if let Err(err) = read_form(engine, &mut multipart, &mut file, &mut fields).await {
        if let Some(stored) = &file {
            engine.remove(stored).await;
        }
        return Err(err);
    }

    parts.extensions.insert(fields);
    if let Some(file) = file {
        parts.extensions.insert(file);
    }

    let mut request = Request::from_parts(parts, Body::empty());
    assign_object_id(request.extensions_mut().get_mut::<UploadedFile>())?;
    Ok(request)
}

async fn read_form(
    engine: &StorageEngine,
    multipart: &mut Multipart,
    file: &mut Option<UploadedFile>,
    fields: &mut FormFields,
) -> Result<(), UploadError> {
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_owned();

        let Some(original_name) = field.file_name().map(str::to_owned) else {
            let value = field.text().await?;
            fields.insert(name, value);
            continue;
        };

        // 未选择文件的文件输入框，丢弃内容
        if original_name.is_empty() {
            field.bytes().await?;
            continue;
        }

        // 只接受一个名为 file 的文件
        if name != FILE_FIELD || file.is_some() {
            return Err(UploadError::UnexpectedField(name));
        }

        let part = FilePart {
            field_name: name,
            original_name,
            mime_type: field.content_type().map(str::to_owned),
        };
        *file = Some(engine.store(part, field).await?);
    }
    Ok(())
}

/// 创建上传路由
///
/// 任意路径的 POST 请求先经过 [`stream_upload`]，再交给 `handler`；
/// 其他方法返回 405。请求体大小不设上限。
///
/// # 参数
///
/// * `engine` - 绑定了凭据和存储桶的存储引擎。
/// * `handler` - 上传完成后的下游处理器。
///
/// # 返回值
///
/// 可以通过 `merge` 或 `nest` 挂载到宿主路由的 `Router`。
pub fn upload_router<H, T>(engine: Arc<StorageEngine>, handler: H) -> Router
where
    H: Handler<T, ()>,
    T: 'static,
{
    let pipeline: MethodRouter =
        post(handler).route_layer(middleware::from_fn_with_state(engine, stream_upload));

    Router::new()
        .fallback(pipeline)
        .layer(DefaultBodyLimit::disable())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::s3::store::{MockObjectStore, StoredObject};
    use crate::utils::object_id::ObjectId;
    use axum::Extension;
    use axum::http::{StatusCode, header};
    use tower::util::ServiceExt;

    const KEY: &str = "65a1b2c3d4e5f60718293a4b/photo.png";
    const BOUNDARY: &str = "X-TEST-BOUNDARY";

    fn uploaded(key: &str) -> UploadedFile {
        UploadedFile {
            field_name: "file".into(),
            original_name: "photo.png".into(),
            mime_type: Some("image/png".into()),
            size: 3,
            key: key.into(),
            ..UploadedFile::default()
        }
    }

    #[test]
    fn test_assign_object_id_sets_id_from_key() {
        let mut file = uploaded(KEY);
        assign_object_id(Some(&mut file)).unwrap();

        let expected: ObjectId = "65a1b2c3d4e5f60718293a4b".parse().unwrap();
        assert_eq!(file.object_id, Some(expected));
        assert_eq!(file.key, KEY);
        assert_eq!(file.original_name, "photo.png");
        assert_eq!(file.size, 3);
    }

    #[test]
    fn test_assign_object_id_is_idempotent() {
        let mut file = uploaded(KEY);
        assign_object_id(Some(&mut file)).unwrap();
        let first = file.clone();
        assign_object_id(Some(&mut file)).unwrap();
        assert_eq!(file, first);
    }

    #[test]
    fn test_assign_object_id_ignores_missing_file() {
        assert_eq!(assign_object_id(None), Ok(()));
    }

    #[test]
    fn test_assign_object_id_ignores_empty_key() {
        let mut file = uploaded("");
        let before = file.clone();
        assign_object_id(Some(&mut file)).unwrap();
        assert_eq!(file, before);
        assert_eq!(file.object_id, None);
    }

    #[test]
    fn test_assign_object_id_fails_on_malformed_key() {
        let mut file = uploaded("not-an-id-without-slash");
        assert!(assign_object_id(Some(&mut file)).is_err());
        assert_eq!(file.object_id, None);
    }

    /// 下游处理器：回显文件描述和表单字段
    async fn inspect(
        file: Option<Extension<UploadedFile>>,
        fields: Option<Extension<FormFields>>,
    ) -> String {
        let object_id = file
            .and_then(|Extension(file)| file.object_id)
            .map(|id| id.to_string())
            .unwrap_or_else(|| "none".into());
        let title = fields
            .and_then(|Extension(fields)| fields.get("title").map(str::to_owned))
            .unwrap_or_else(|| "none".into());
        format!("{object_id} {title}")
    }

    fn engine(store: MockObjectStore) -> Arc<StorageEngine> {
        Arc::new(StorageEngine::new(Arc::new(store), "uploads"))
    }

    fn multipart_request(uri: &str, body: String) -> Request {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    fn file_part(field: &str, file_name: &str, content: &str) -> String {
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\nContent-Type: image/png\r\n\r\n{content}\r\n"
        )
    }

    fn text_part(field: &str, value: &str) -> String {
        format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"\r\n\r\n{value}\r\n")
    }

    fn closing() -> String {
        format!("--{BOUNDARY}--\r\n")
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_upload_attaches_object_id_and_fields() {
        let mut store = MockObjectStore::new();
        store
            .expect_put_object()
            .withf(|target, body| target.key.ends_with("/photo.png") && &body[..] == b"png-bytes")
            .times(1)
            .returning(|_, _| Ok(StoredObject::default()));

        let body = [
            text_part("title", "Holiday"),
            file_part("file", "photo.png", "png-bytes"),
            closing(),
        ]
        .concat();

        let response = upload_router(engine(store), inspect)
            .oneshot(multipart_request("/any/path", body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let text = body_text(response).await;
        let (object_id, title) = text.split_once(' ').unwrap();
        assert!(object_id.parse::<ObjectId>().is_ok());
        assert_eq!(title, "Holiday");
    }

    #[tokio::test]
    async fn test_non_multipart_request_passes_through() {
        let mut store = MockObjectStore::new();
        store.expect_put_object().never();

        let request = Request::builder()
            .method("POST")
            .uri("/")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{}"))
            .unwrap();

        let response = upload_router(engine(store), inspect)
            .oneshot(request)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "none none");
    }

    #[tokio::test]
    async fn test_form_without_file_reaches_handler() {
        let mut store = MockObjectStore::new();
        store.expect_put_object().never();

        let body = [text_part("title", "Holiday"), closing()].concat();
        let response = upload_router(engine(store), inspect)
            .oneshot(multipart_request("/", body))
            .await
            .unwrap();

        assert_eq!(body_text(response).await, "none Holiday");
    }

    #[tokio::test]
    async fn test_unexpected_file_field_is_rejected() {
        let mut store = MockObjectStore::new();
        store.expect_put_object().never();

        let body = [file_part("avatar", "photo.png", "png-bytes"), closing()].concat();
        let response = upload_router(engine(store), inspect)
            .oneshot(multipart_request("/", body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_text(response).await, "Unexpected field: avatar");
    }

    #[tokio::test]
    async fn test_empty_file_input_is_skipped() {
        let mut store = MockObjectStore::new();
        store.expect_put_object().never();

        let body = [
            text_part("title", "Holiday"),
            file_part("file", "", ""),
            closing(),
        ]
        .concat();
        let response = upload_router(engine(store), inspect)
            .oneshot(multipart_request("/", body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "none Holiday");
    }

    #[tokio::test]
    async fn test_second_file_is_rejected() {
        let mut store = MockObjectStore::new();
        store
            .expect_put_object()
            .withf(|target, _| target.key.ends_with("/one.png"))
            .times(1)
            .returning(|_, _| Ok(StoredObject::default()));
        store
            .expect_delete_object()
            .withf(|bucket, key| bucket.to_string() == "uploads" && key.ends_with("/one.png"))
            .times(1)
            .returning(|_, _| Ok(()));

        let body = [
            file_part("file", "one.png", "1"),
            file_part("file", "two.png", "2"),
            closing(),
        ]
        .concat();
        let response = upload_router(engine(store), inspect)
            .oneshot(multipart_request("/", body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_text(response).await, "Unexpected field: file");
    }

    #[tokio::test]
    async fn test_empty_file_input_after_stored_file_is_ignored() {
        let mut store = MockObjectStore::new();
        store
            .expect_put_object()
            .times(1)
            .returning(|_, _| Ok(StoredObject::default()));
        store.expect_delete_object().never();

        let body = [
            file_part("file", "one.png", "1"),
            file_part("file", "", ""),
            closing(),
        ]
        .concat();
        let response = upload_router(engine(store), inspect)
            .oneshot(multipart_request("/", body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let text = body_text(response).await;
        assert!(text.ends_with(" none"));
        assert_ne!(text, "none none");
    }

    #[tokio::test]
    async fn test_only_post_is_routed() {
        let store = MockObjectStore::new();
        let request = Request::builder()
            .method("GET")
            .uri("/photo.png")
            .body(Body::empty())
            .unwrap();

        let response = upload_router(engine(store), inspect)
            .oneshot(request)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
