use super::support::{assets_tree, filesystems, INDEX_HTML};
use http::{header, Request, StatusCode};
use packfs::serve::server::serve_connection;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread;

#[test]
fn index_html_is_byte_identical() {
    let dir = assets_tree();
    let on_disk = std::fs::read(dir.path().join("assets/index.html")).unwrap();
    assert_eq!(on_disk, INDEX_HTML.as_bytes());

    for fs in filesystems(dir.path()) {
        let handler = fs.serve("assets");
        let response = handler.get("/index.html");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.body(), &on_disk);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/html; charset=utf-8"
        );

        // the directory itself resolves to the same document
        assert_eq!(handler.get("/").body(), &on_disk);
    }
}

#[test]
fn root_prefix_is_cleaned() {
    let dir = assets_tree();
    for fs in filesystems(dir.path()) {
        let handler = fs.serve("./assets/");
        assert_eq!(handler.root(), "assets");
        assert_eq!(handler.get("/js/app.js").status(), StatusCode::OK);
        assert_eq!(handler.get("/assets/js/app.js").status(), StatusCode::NOT_FOUND);
    }
}

#[test]
fn directory_listing_is_ordered() {
    let dir = assets_tree();
    for fs in filesystems(dir.path()) {
        let response = fs.serve("assets").get("/readdir/");
        assert_eq!(response.status(), StatusCode::OK);
        let body = String::from_utf8(response.into_body()).unwrap();
        let one = body.find("1.txt").unwrap();
        let two = body.find("2.txt").unwrap();
        let three = body.find("3.txt").unwrap();
        assert!(one < two && two < three);
    }
}

#[test]
fn head_and_conditional_requests() {
    let dir = assets_tree();
    for fs in filesystems(dir.path()) {
        let handler = fs.serve("assets");
        let full = handler.get("/css/site.css");
        let last_modified = full.headers()[header::LAST_MODIFIED].clone();

        let head = handler.handle(&Request::head("/css/site.css").body(()).unwrap());
        assert_eq!(head.status(), StatusCode::OK);
        assert!(head.body().is_empty());
        assert_eq!(
            head.headers()[header::CONTENT_LENGTH],
            full.body().len().to_string().as_str()
        );

        let conditional = Request::get("/css/site.css")
            .header(header::IF_MODIFIED_SINCE, last_modified)
            .body(())
            .unwrap();
        assert_eq!(handler.handle(&conditional).status(), StatusCode::NOT_MODIFIED);
    }
}

#[test]
fn live_tcp_round_trip() {
    let dir = assets_tree();
    let fs = filesystems(dir.path()).remove(0);
    let handler = fs.serve("assets");

    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let server = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        serve_connection(stream, &handler).unwrap();
    });

    let mut client = TcpStream::connect(addr).unwrap();
    client
        .write_all(b"GET /js/app.js HTTP/1.1\r\nHost: localhost\r\n\r\n")
        .unwrap();
    let mut raw = Vec::new();
    client.read_to_end(&mut raw).unwrap();
    server.join().unwrap();

    let text = String::from_utf8(raw).unwrap();
    assert!(text.starts_with("HTTP/1.1 200 OK\r\n"), "{text}");
    assert!(text.contains("connection: close\r\n"));
    assert!(text.ends_with("\r\n\r\nconsole.log('packfs');\n"));
}
