//! Form submissions over a real socket: urlencoded bodies, bracket
//! notation and multipart uploads, all observed through the echo handler.

mod helpers;

use helpers::{connect, read_response, send, TestServer};

fn post(port: u16, path: &str, content_type: &str, body: &str) -> String {
    format!(
        "POST {path} HTTP/1.1\r\nHost: 127.0.0.1:{port}\r\nConnection: close\r\n\
         Content-Type: {content_type}\r\nContent-Length: {}\r\n\r\n{body}",
        body.len()
    )
}

#[test]
fn urlencoded_body_reaches_the_parameter_map() {
    let server = TestServer::start();
    let mut stream = connect(server.port);
    send(
        &mut stream,
        &post(
            server.port,
            "/echo",
            "application/x-www-form-urlencoded",
            "name=claire&city=Lyon%202e",
        ),
    );
    let response = read_response(&mut stream);
    assert_eq!(response.status, 200);
    let body = response.body_text();
    assert!(body.contains("name=claire"));
    assert!(body.contains("city=Lyon 2e"));
}

#[test]
fn query_string_and_body_parameters_combine() {
    let server = TestServer::start();
    let mut stream = connect(server.port);
    send(
        &mut stream,
        &post(
            server.port,
            "/echo?page=2",
            "application/x-www-form-urlencoded",
            "q=standing+stones",
        ),
    );
    let response = read_response(&mut stream);
    let body = response.body_text();
    assert!(body.contains("page=2"));
    assert!(body.contains("q=standing stones"));
}

#[test]
fn multipart_field_and_file_part() {
    let server = TestServer::start();
    let boundary = "----cairn-boundary-7431";
    let body = format!(
        "--{boundary}\r\n\
         Content-Disposition: form-data; name=\"label\"\r\n\r\n\
         granite\r\n\
         --{boundary}\r\n\
         Content-Disposition: form-data; name=\"upload\"; filename=\"x.txt\"\r\n\
         Content-Type: text/plain\r\n\r\n\
         exact bytes\r\n\
         --{boundary}--\r\n"
    );

    let mut stream = connect(server.port);
    send(
        &mut stream,
        &post(
            server.port,
            "/echo",
            &format!("multipart/form-data; boundary={boundary}"),
            &body,
        ),
    );
    let response = read_response(&mut stream);
    assert_eq!(response.status, 200);
    let echoed = response.body_text();
    assert!(echoed.contains("label=granite"));
    assert!(echoed.contains("file:upload:x.txt:11"));
}

#[test]
fn multipart_without_boundary_is_a_400() {
    let server = TestServer::start();
    let mut stream = connect(server.port);
    send(
        &mut stream,
        &post(server.port, "/echo", "multipart/form-data", "--x\r\n--x--\r\n"),
    );
    let response = read_response(&mut stream);
    assert_eq!(response.status, 400);
}

#[test]
fn body_split_across_tcp_segments_is_accumulated() {
    let server = TestServer::start();
    let mut stream = connect(server.port);

    let body = "name=slow&extra=client";
    let request = post(
        server.port,
        "/echo",
        "application/x-www-form-urlencoded",
        body,
    );
    // Head plus half the body, a pause, then the rest: Content-Length has
    // to keep the reader pulling until the declared length is met.
    let split = request.len() - body.len() / 2;
    send(&mut stream, &request[..split]);
    std::thread::sleep(std::time::Duration::from_millis(100));
    send(&mut stream, &request[split..]);

    let response = read_response(&mut stream);
    assert_eq!(response.status, 200);
    assert!(response.body_text().contains("extra=client"));
}
