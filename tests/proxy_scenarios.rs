//! End-to-end tests: a real relay in front of a programmable origin.

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use serde_json::Value;

use hls_relay::codec::HeaderBag;
use hls_relay::fetch::{OriginFetcher, MAX_REDIRECTS};

mod common;
use common::{
    client, proxy_url, start_origin, start_relay, start_relay_with, test_config, Reply,
};

const MEDIA_PLAYLIST: &str = "#EXTM3U\n\
#EXT-X-VERSION:3\n\
#EXTINF:10,\n\
segment1.ts\n\
#EXTINF:10,\n\
segment2.ts\n\
#EXT-X-ENDLIST\n";

const HLS: &str = "application/vnd.apple.mpegurl";

#[tokio::test]
async fn rewrites_media_playlist_segments() {
    let origin = start_origin(|req| match req.path.as_str() {
        "/path/index.m3u8" => Reply::ok("text/plain", MEDIA_PLAYLIST),
        _ => Reply::status(404, "missing"),
    })
    .await;
    let (relay, _shutdown) = start_relay(test_config()).await;

    let res = client()
        .get(proxy_url(relay, &origin.url("/path/index.m3u8"), None))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["content-type"], HLS);
    assert_eq!(res.headers()["cache-control"], "no-cache");
    assert_eq!(res.headers()["access-control-allow-origin"], "*");

    let expected = format!(
        "#EXTM3U\n#EXT-X-VERSION:3\n#EXTINF:10,\n{}\n#EXTINF:10,\n{}\n#EXT-X-ENDLIST\n",
        proxy_url(relay, &origin.url("/path/segment1.ts"), None),
        proxy_url(relay, &origin.url("/path/segment2.ts"), None),
    );
    assert_eq!(res.text().await.unwrap(), expected);
    assert_eq!(origin.count(), 1);
}

#[tokio::test]
async fn forwards_and_propagates_header_bag() {
    let origin = start_origin(|_| Reply::ok(HLS, MEDIA_PLAYLIST)).await;
    let (relay, _shutdown) = start_relay(test_config()).await;
    let bag: HeaderBag = [("User-Agent", "X")].into_iter().collect();

    let body = client()
        .get(proxy_url(relay, &origin.url("/path/index.m3u8"), Some(&bag)))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();

    let segment_lines: Vec<&str> = body.lines().filter(|l| !l.starts_with('#')).collect();
    assert_eq!(segment_lines.len(), 2);
    for line in segment_lines {
        assert!(line.ends_with("&headers=%7B%22User-Agent%22%3A%22X%22%7D"), "{line}");
    }
    assert_eq!(origin.requests()[0].header("user-agent"), Some("X"));
}

#[tokio::test]
async fn head_reports_rewritten_length() {
    let origin = start_origin(|_| Reply::ok(HLS, MEDIA_PLAYLIST)).await;
    let (relay, _shutdown) = start_relay(test_config()).await;
    let url = proxy_url(relay, &origin.url("/path/index.m3u8"), None);

    let get = client().get(&url).send().await.unwrap();
    let body_len = get.bytes().await.unwrap().len();

    let head = client().head(&url).send().await.unwrap();
    assert_eq!(head.status(), StatusCode::OK);
    let declared: usize = head.headers()["content-length"]
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert_eq!(declared, body_len);
    assert!(declared > MEDIA_PLAYLIST.len());
    assert!(head.bytes().await.unwrap().is_empty());
}

#[tokio::test]
async fn relays_binary_files_untouched() {
    let payload: Vec<u8> = (0..=255u8).cycle().take(4096).collect();
    let served = payload.clone();
    let origin = start_origin(move |_| Reply::ok("video/mp4", served.clone())).await;
    let (relay, _shutdown) = start_relay(test_config()).await;

    let res = client()
        .get(proxy_url(relay, &origin.url("/movie.mp4"), None))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["content-type"], "video/mp4");
    assert_eq!(res.bytes().await.unwrap().as_ref(), payload.as_slice());
}

#[tokio::test]
async fn missing_url_never_reaches_origin() {
    let origin = start_origin(|_| Reply::ok("text/plain", "hi")).await;
    let (relay, _shutdown) = start_relay(test_config()).await;

    let res = client()
        .get(format!("http://{}/proxy?auth={}", relay, common::AUTH))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let json: Value = res.json().await.unwrap();
    assert_eq!(json["code"], "invalid_request");
    assert_eq!(origin.count(), 0);
}

#[tokio::test]
async fn resolves_against_final_redirect_url() {
    let origin = start_origin(|req| match req.path.as_str() {
        "/old/index.m3u8" => Reply::redirect("/new/live/index.m3u8"),
        "/new/live/index.m3u8" => Reply::ok(HLS, "#EXTM3U\n#EXTINF:4,\nchunk.ts\n"),
        _ => Reply::status(404, ""),
    })
    .await;
    let (relay, _shutdown) = start_relay(test_config()).await;

    let body = client()
        .get(proxy_url(relay, &origin.url("/old/index.m3u8"), None))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();

    let expected = proxy_url(relay, &origin.url("/new/live/chunk.ts"), None);
    assert!(body.contains(&expected), "{body}");
    assert_eq!(origin.count(), 2);
}

#[tokio::test]
async fn redirect_chain_stops_after_limit() {
    let origin = start_origin(|req| {
        let hop: usize = req.path.trim_start_matches("/r").parse().unwrap_or(0);
        Reply::redirect(&format!("/r{}", hop + 1))
    })
    .await;
    let (relay, _shutdown) = start_relay(test_config()).await;

    let res = client()
        .get(proxy_url(relay, &origin.url("/r0"), None))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(res.headers()["access-control-allow-origin"], "*");
    let json: Value = res.json().await.unwrap();
    assert_eq!(json["code"], "too_many_redirects");
    assert_eq!(origin.count(), MAX_REDIRECTS + 1);
}

#[tokio::test]
async fn redirect_into_internal_address_is_forbidden() {
    let internal = start_origin(|_| Reply::ok("text/plain", "internal-only")).await;
    let secret = internal.url("/admin/secret");
    let public = start_origin(move |_| Reply::redirect(&secret)).await;

    // The first hop is loopback too, so only redirect hops are held to the block here.
    let config = test_config();
    let fetcher = Arc::new(OriginFetcher::new(&config.fetch, true).unwrap());
    let (relay, _shutdown) = start_relay_with(config, fetcher).await;

    let res = client()
        .get(proxy_url(relay, &public.url("/live/index.m3u8"), None))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert_eq!(res.headers()["access-control-allow-origin"], "*");
    let json: Value = res.json().await.unwrap();
    assert_eq!(json["code"], "forbidden_redirect");
    assert_eq!(public.count(), 1);
    assert_eq!(internal.count(), 0);
}

#[tokio::test]
async fn header_bag_accept_replaces_client_default() {
    let origin = start_origin(|_| Reply::ok("video/mp2t", "TS")).await;
    let (relay, _shutdown) = start_relay(test_config()).await;
    let bag: HeaderBag = [("Accept", "application/x-mpegURL")].into_iter().collect();

    let res = client()
        .get(proxy_url(relay, &origin.url("/a.ts"), Some(&bag)))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client()
        .get(proxy_url(relay, &origin.url("/b.ts"), None))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let requests = origin.requests();
    let with_bag = requests.iter().find(|r| r.path == "/a.ts").unwrap();
    let accepts: Vec<&str> = with_bag
        .headers
        .iter()
        .filter(|(k, _)| k.eq_ignore_ascii_case("accept"))
        .map(|(_, v)| v.as_str())
        .collect();
    assert_eq!(accepts, ["application/x-mpegURL"]);

    let without_bag = requests.iter().find(|r| r.path == "/b.ts").unwrap();
    assert_eq!(without_bag.header("accept"), Some("*/*"));
}

#[tokio::test]
async fn nested_playlists_keep_headers_at_every_hop() {
    let origin = start_origin(|req| match req.path.as_str() {
        "/master.m3u8" => Reply::ok(
            HLS,
            "#EXTM3U\n#EXT-X-STREAM-INF:BANDWIDTH=800000\nlow/index.m3u8\n",
        ),
        "/low/index.m3u8" => Reply::ok(HLS, "#EXTM3U\n#EXTINF:6,\nseg0.ts\n"),
        "/low/seg0.ts" => Reply::ok("video/mp2t", "TS"),
        _ => Reply::status(404, ""),
    })
    .await;
    let (relay, _shutdown) = start_relay(test_config()).await;
    let bag: HeaderBag = [("X-Token", "abc")].into_iter().collect();
    let http = client();

    let master = http
        .get(proxy_url(relay, &origin.url("/master.m3u8"), Some(&bag)))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    let variant_url = master.lines().last().unwrap().to_string();

    let variant = http.get(&variant_url).send().await.unwrap().text().await.unwrap();
    let segment_url = variant.lines().last().unwrap().to_string();

    let segment = http.get(&segment_url).send().await.unwrap();
    assert_eq!(segment.status(), StatusCode::OK);
    assert_eq!(segment.text().await.unwrap(), "TS");

    let requests = origin.requests();
    let paths: Vec<&str> = requests.iter().map(|r| r.path.as_str()).collect();
    assert_eq!(paths, ["/master.m3u8", "/low/index.m3u8", "/low/seg0.ts"]);
    for request in &requests {
        assert_eq!(request.header("x-token"), Some("abc"), "{}", request.path);
    }
}

#[tokio::test]
async fn detects_playlists_by_content_type() {
    let origin = start_origin(|_| Reply::ok(HLS, "#EXTM3U\n#EXTINF:6,\npart.ts\n")).await;
    let (relay, _shutdown) = start_relay(test_config()).await;

    let res = client()
        .get(proxy_url(relay, &origin.url("/live/stream"), None))
        .send()
        .await
        .unwrap();

    assert_eq!(res.headers()["content-type"], HLS);
    let body = res.text().await.unwrap();
    assert!(body.contains(&proxy_url(relay, &origin.url("/live/part.ts"), None)));
    assert_eq!(origin.count(), 1);
}

#[tokio::test]
async fn non_success_playlist_is_relayed_raw() {
    let origin = start_origin(|_| Reply::ok("text/plain", "gone").with_status(404)).await;
    let (relay, _shutdown) = start_relay(test_config()).await;

    let res = client()
        .get(proxy_url(relay, &origin.url("/index.m3u8"), None))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(res.text().await.unwrap(), "gone");
}

#[tokio::test]
async fn invalid_utf8_playlist_is_bad_gateway() {
    let origin = start_origin(|_| Reply::ok(HLS, vec![0x23, 0x45, 0xff, 0xfe, 0x0a])).await;
    let (relay, _shutdown) = start_relay(test_config()).await;

    let res = client()
        .get(proxy_url(relay, &origin.url("/index.m3u8"), None))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    let json: Value = res.json().await.unwrap();
    assert_eq!(json["code"], "invalid_manifest");
}

#[tokio::test]
async fn silent_origin_times_out() {
    let origin = start_origin(|_| {
        Reply::ok("video/mp4", "late").delayed(Duration::from_secs(3))
    })
    .await;
    let mut config = test_config();
    config.fetch.timeout_ms = 300;
    let (relay, _shutdown) = start_relay(config).await;

    let res = client()
        .get(proxy_url(relay, &origin.url("/slow.mp4"), None))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(res.headers()["access-control-allow-origin"], "*");
    let json: Value = res.json().await.unwrap();
    assert_eq!(json["code"], "origin_timeout");
}

#[tokio::test]
async fn forwards_range_and_partial_content() {
    let origin = start_origin(|req| match req.header("range") {
        Some("bytes=0-3") => Reply::ok("video/mp4", "abcd")
            .with_status(206)
            .with_header("Content-Range", "bytes 0-3/10"),
        _ => Reply::ok("video/mp4", "abcdefghij"),
    })
    .await;
    let (relay, _shutdown) = start_relay(test_config()).await;

    let res = client()
        .get(proxy_url(relay, &origin.url("/clip.mp4"), None))
        .header("Range", "bytes=0-3")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(res.headers()["content-range"], "bytes 0-3/10");
    assert_eq!(res.text().await.unwrap(), "abcd");
}

#[tokio::test]
async fn head_falls_back_to_get_when_origin_rejects_it() {
    let origin = start_origin(|req| {
        if req.method == "HEAD" {
            Reply::status(405, "")
        } else {
            Reply::ok("application/octet-stream", "abcdef")
        }
    })
    .await;
    let (relay, _shutdown) = start_relay(test_config()).await;

    let res = client()
        .head(proxy_url(relay, &origin.url("/file.bin"), None))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["content-length"], "6");
    let methods: Vec<String> = origin.requests().into_iter().map(|r| r.method).collect();
    assert_eq!(methods, ["HEAD", "GET"]);
}

#[tokio::test]
async fn wrong_auth_is_rejected_with_cors() {
    let origin = start_origin(|_| Reply::ok("text/plain", "hi")).await;
    let (relay, _shutdown) = start_relay(test_config()).await;

    let res = client()
        .get(format!(
            "http://{}/proxy?url={}&auth=nope",
            relay,
            urlencoding::encode(&origin.url("/a.ts"))
        ))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(res.headers()["access-control-allow-origin"], "*");
    assert_eq!(origin.count(), 0);
}

#[tokio::test]
async fn health_and_status_report_service() {
    let (relay, _shutdown) = start_relay(test_config()).await;
    let http = client();

    let health: Value = http
        .get(format!("http://{}/health", relay))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "ok");
    assert_eq!(health["service"], "hls-relay");

    let status: Value = http
        .get(format!("http://{}/status", relay))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status["status"], "running");
    assert_eq!(status["ftp_available"], false);
}

#[tokio::test]
async fn graceful_shutdown_stops_listener() {
    let (relay, shutdown) = start_relay(test_config()).await;
    let http = client();
    let url = format!("http://{}/health", relay);

    assert!(http.get(&url).send().await.is_ok());
    shutdown.trigger();
    tokio::time::sleep(Duration::from_millis(200)).await;

    let fresh = reqwest::Client::builder().no_proxy().build().unwrap();
    assert!(fresh.get(&url).send().await.is_err());
}
