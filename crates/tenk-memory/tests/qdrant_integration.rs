use std::sync::Arc;

use testcontainers::core::{ContainerPort, WaitFor};
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, GenericImage};
use tenk_memory::document::pipeline::EmbedFn;
use tenk_memory::document::{
    Document, DocumentMetadata, IngestionPipeline, SplitterConfig, TextSplitter,
};
use tenk_memory::{QdrantOps, VectorStore};

const QDRANT_GRPC_PORT: ContainerPort = ContainerPort::Tcp(6334);
const COLLECTION: &str = "test_filings";
const VECTOR_SIZE: u64 = 4;

fn qdrant_image() -> GenericImage {
    GenericImage::new("qdrant/qdrant", "v1.16.0")
        .with_wait_for(WaitFor::message_on_stdout("gRPC listening"))
        .with_exposed_port(QDRANT_GRPC_PORT)
}

async fn setup() -> (QdrantOps, ContainerAsync<GenericImage>) {
    let container = qdrant_image().start().await.unwrap();
    let port = container.get_host_port_ipv4(6334).await.unwrap();
    let qdrant = QdrantOps::new(&format!("http://127.0.0.1:{port}")).unwrap();
    (qdrant, container)
}

#[allow(clippy::cast_precision_loss)]
fn fake_embed_fn() -> EmbedFn {
    Box::new(|text: &str| {
        let len = text.len() as f32;
        Box::pin(async move { Ok(vec![len / 1000.0, 0.1, 0.2, 0.3]) })
    })
}

fn filing(company: &str, content: &str) -> Document {
    Document {
        content: content.to_owned(),
        metadata: DocumentMetadata {
            source: format!("/data/{company}.txt"),
            company: company.to_owned(),
            filename: format!("{company}.txt"),
        },
    }
}

#[tokio::test]
#[ignore = "requires Docker for the Qdrant container"]
async fn ensure_collection_is_idempotent() {
    let (qdrant, _container) = setup().await;
    qdrant.ensure_collection(COLLECTION, VECTOR_SIZE).await.unwrap();
    qdrant.ensure_collection(COLLECTION, VECTOR_SIZE).await.unwrap();
    assert!(qdrant.collection_exists(COLLECTION).await.unwrap());
}

#[tokio::test]
#[ignore = "requires Docker for the Qdrant container"]
async fn ingest_and_search_with_threshold() {
    let (qdrant, _container) = setup().await;
    qdrant.ensure_collection(COLLECTION, VECTOR_SIZE).await.unwrap();

    let store: Arc<dyn VectorStore> = Arc::new(qdrant.clone());
    let pipeline = IngestionPipeline::new(
        TextSplitter::new(SplitterConfig::default()),
        Arc::clone(&store),
        COLLECTION,
        fake_embed_fn(),
    );

    let count = pipeline
        .ingest(filing("Apple Inc", &"Net sales by category. ".repeat(100)))
        .await
        .unwrap();
    assert_eq!(count, 3);

    let hits = store
        .search(COLLECTION, vec![1.0, 0.1, 0.2, 0.3], 4, Some(0.1))
        .await
        .unwrap();
    assert_eq!(hits.len(), 3);
    assert!(hits.windows(2).all(|w| w[0].score >= w[1].score));
    assert!(hits.iter().all(|h| h.payload["company"] == "Apple Inc"));

    let none = store
        .search(COLLECTION, vec![-1.0, -0.1, -0.2, -0.3], 4, Some(0.1))
        .await
        .unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
#[ignore = "requires Docker for the Qdrant container"]
async fn reingest_overwrites_points() {
    let (qdrant, _container) = setup().await;
    qdrant.ensure_collection(COLLECTION, VECTOR_SIZE).await.unwrap();

    let store: Arc<dyn VectorStore> = Arc::new(qdrant.clone());
    let pipeline = IngestionPipeline::new(
        TextSplitter::new(SplitterConfig::default()),
        Arc::clone(&store),
        COLLECTION,
        fake_embed_fn(),
    );
    pipeline.ingest(filing("Alphabet Inc", "v1")).await.unwrap();
    pipeline.ingest(filing("Alphabet Inc", "v2 text")).await.unwrap();

    let hits = store
        .search(COLLECTION, vec![0.0, 0.1, 0.2, 0.3], 10, None)
        .await
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].payload["content"], "v2 text");
}
