mod mock_tcp_stream;

pub use mock_tcp_stream::MockTcpStream;
