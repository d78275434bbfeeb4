//! Generates the gRPC service plumbing for `kvstore.KvStoreInterface`.
//!
//! The message types are declared by hand in `src/protocol/message.rs`, so the
//! service is described with the manual builder and no `protoc` is needed at
//! build time. Keep the routes in sync with `proto/kv_store_interface.proto`.

fn main() {
  let method = |name: &str, route: &str, input: &str, output: &str| {
    tonic_build::manual::Method::builder()
      .name(name)
      .route_name(route)
      .input_type(input)
      .output_type(output)
      .codec_path("tonic::codec::ProstCodec")
      .build()
  };

  let service = tonic_build::manual::Service::builder()
    .name("KvStoreInterface")
    .package("kvstore")
    .method(method(
      "get_key",
      "GetKey",
      "crate::protocol::GetKeyArg",
      "crate::protocol::GetKeyRet",
    ))
    .method(method(
      "put_key",
      "PutKey",
      "crate::protocol::PutKeyArg",
      "crate::protocol::PutKeyRet",
    ))
    .build();

  tonic_build::manual::Builder::new().compile(&[service]);

  println!("cargo:rerun-if-changed=build.rs");
}
