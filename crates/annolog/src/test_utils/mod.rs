pub mod mock_annotation_server;

pub use mock_annotation_server::MockAnnotationServer;
