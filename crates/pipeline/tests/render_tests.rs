//! Integration tests for scene rendering.
//!
//! A fake runner stands in for ffmpeg: it writes each command's output
//! file so the renderer's filesystem handling and candidate selection run
//! for real.

use std::path::Path;
use std::sync::Mutex;

use image::{GrayImage, ImageFormat, Luma};
use assert_matches::assert_matches;
use kino_core::storyboard::{PosterCandidate, Scene, Storyboard, StoryboardResponse};
use kino_pipeline::error::PipelineError;
use kino_pipeline::posters::render_poster_candidates;
use kino_pipeline::render::{
    render_scene_assets, render_storyboards, ClipEncoder, RenderSettings, SceneRenderRequest,
};
use kino_pipeline::runner::{CommandOutput, CommandRunner};
use kino_pipeline::sharpness::laplacian_variance;

/// Writes a sharp frame for the `p0` candidate and flat frames otherwise.
/// Clip commands starting at `FAIL_START` and frame grabs at `FAIL_FRAME`
/// exit non-zero; frame grabs at `EMPTY_FRAME` write an empty file.
#[derive(Default)]
struct FakeFfmpeg {
    commands: Mutex<Vec<Vec<String>>>,
}

const FAIL_START: &str = "00:00:59.00";
const FAIL_FRAME: &str = "00:00:30.00";
const EMPTY_FRAME: &str = "00:00:40.00";

impl CommandRunner for FakeFfmpeg {
    async fn run(&self, args: &[String]) -> Result<CommandOutput, PipelineError> {
        self.commands.lock().unwrap().push(args.to_vec());

        let is_clip = args.iter().any(|a| a == "-to");
        if is_clip && args[3] == FAIL_START {
            return Err(PipelineError::CommandFailed {
                program: args[0].clone(),
                exit_code: Some(1),
                stderr: "Invalid data found when processing input".into(),
            });
        }
        if !is_clip && args[3] == FAIL_FRAME {
            return Err(PipelineError::CommandFailed {
                program: args[0].clone(),
                exit_code: Some(1),
                stderr: "Output file is empty, nothing was encoded".into(),
            });
        }

        let output = Path::new(args.last().expect("output path"));
        if !is_clip && args[3] == EMPTY_FRAME {
            std::fs::write(output, b"").unwrap();
        } else if is_clip {
            std::fs::write(output, b"fake clip").unwrap();
        } else {
            let sharp = output.file_name().is_some_and(|n| n == "thumb_p0.webp");
            let frame = if sharp {
                GrayImage::from_fn(32, 32, |x, y| Luma([if (x + y) % 2 == 0 { 10 } else { 240 }]))
            } else {
                GrayImage::from_pixel(32, 32, Luma([128]))
            };
            frame.save_with_format(output, ImageFormat::Png).unwrap();
        }
        Ok(CommandOutput::default())
    }
}

fn scene(number: i64, start: &str, end: &str, thumb: &str) -> Scene {
    serde_json::from_value(serde_json::json!({
        "scene_number": number,
        "start_tc": start,
        "end_tc": end,
        "thumbnail_tc": thumb,
    }))
    .unwrap()
}

#[tokio::test]
async fn scene_render_keeps_sharpest_candidate_and_cleans_up() {
    let dir = tempfile::tempdir().unwrap();
    let runner = FakeFfmpeg::default();
    let request = SceneRenderRequest {
        input_path: dir.path().join("source.mp4"),
        clip_dir: dir.path().join("clips/board_1"),
        thumb_dir: dir.path().join("thumbs/board_1"),
        scene_asset_index: 3,
        start_tc: "00:00:10.00".into(),
        end_tc: "00:00:12.00".into(),
        thumbnail_tc: "00:00:11.00".into(),
        fps: 24,
        offsets: vec![-8, 0, 8],
        encoder: ClipEncoder::default(),
    };

    let assets = render_scene_assets(&runner, &request).await.unwrap();

    assert_eq!(assets.clip_name, "scene_03.mp4");
    assert_eq!(assets.thumb_name, "scene_03.webp");
    assert!(dir.path().join("clips/board_1/scene_03.mp4").exists());
    assert!(!dir.path().join("thumbs/board_1/scene_03_candidates").exists());

    let thumb = image::ImageReader::open(dir.path().join("thumbs/board_1/scene_03.webp"))
        .unwrap()
        .with_guessed_format()
        .unwrap()
        .decode()
        .unwrap()
        .to_luma8();
    assert!(laplacian_variance(&thumb) > 0.0, "flat candidate was picked");

    let commands = runner.commands.lock().unwrap();
    assert_eq!(commands.len(), 4);
    assert!(commands[0].contains(&"libx264".to_string()));
    let seeks: Vec<&str> = commands[1..].iter().map(|c| c[3].as_str()).collect();
    assert_eq!(seeks, ["00:00:10.16", "00:00:11.00", "00:00:11.08"]);
}

#[tokio::test]
async fn nvenc_encoder_is_used_when_selected() {
    let dir = tempfile::tempdir().unwrap();
    let runner = FakeFfmpeg::default();
    let request = SceneRenderRequest {
        input_path: dir.path().join("source.mp4"),
        clip_dir: dir.path().join("clips"),
        thumb_dir: dir.path().join("thumbs"),
        scene_asset_index: 0,
        start_tc: "00:00:01.00".into(),
        end_tc: "00:00:02.00".into(),
        thumbnail_tc: "00:00:01.12".into(),
        fps: 24,
        offsets: vec![0],
        encoder: ClipEncoder::Nvenc,
    };

    render_scene_assets(&runner, &request).await.unwrap();

    let commands = runner.commands.lock().unwrap();
    assert!(commands[0].contains(&"h264_nvenc".to_string()));
}

#[tokio::test]
async fn storyboard_render_sets_urls_and_reports_failures() {
    let dir = tempfile::tempdir().unwrap();
    let runner = FakeFfmpeg::default();
    let mut response = StoryboardResponse {
        movie_title: "Test".into(),
        duration: "00:02:00".into(),
        storyboards: vec![
            Storyboard {
                name: "Hype".into(),
                target_length: String::new(),
                tone: String::new(),
                description: String::new(),
                scenes: vec![
                    scene(1, "00:00:01.00", "00:00:03.00", "00:00:02.00"),
                    scene(2, FAIL_START, "00:01:01.00", "00:01:00.00"),
                ],
            },
            Storyboard {
                name: "Dark".into(),
                target_length: String::new(),
                tone: String::new(),
                description: String::new(),
                scenes: vec![scene(7, "00:00:20.00", "00:00:22.00", "00:00:21.00")],
            },
        ],
        poster_candidates: None,
    };
    let settings = RenderSettings {
        project_dir: dir.path().join("p1"),
        input_path: dir.path().join("p1.mp4"),
        media_base_url: "/media".into(),
        fps: 24,
        offsets: vec![-8, 0, 8],
        encoder: ClipEncoder::default(),
        workers: 2,
    };

    let report = render_storyboards(&runner, "p1", &mut response, &settings).await;

    assert_eq!(report.rendered, 2);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].storyboard_index, 0);
    assert_eq!(report.failures[0].scene_number, 2);
    assert_eq!(report.poster_url.as_deref(), Some("/media/p1/thumbs/board_1/scene_01.webp"));

    let first = &response.storyboards[0].scenes[0];
    assert_eq!(first.clip_url.as_deref(), Some("/media/p1/clips/board_1/scene_01.mp4"));
    assert_eq!(first.thumbnail_url.as_deref(), Some("/media/p1/thumbs/board_1/scene_01.webp"));
    assert!(response.storyboards[0].scenes[1].clip_url.is_none());

    let other = &response.storyboards[1].scenes[0];
    assert_eq!(other.clip_url.as_deref(), Some("/media/p1/clips/board_2/scene_01.mp4"));
    assert!(dir.path().join("p1/thumbs/board_2/scene_01.webp").exists());
}

#[tokio::test]
async fn failed_frame_grab_still_removes_candidates() {
    let dir = tempfile::tempdir().unwrap();
    let runner = FakeFfmpeg::default();
    let request = SceneRenderRequest {
        input_path: dir.path().join("source.mp4"),
        clip_dir: dir.path().join("clips"),
        thumb_dir: dir.path().join("thumbs"),
        scene_asset_index: 2,
        start_tc: "00:00:29.00".into(),
        end_tc: "00:00:31.00".into(),
        // Offset 0 lands on FAIL_FRAME after the -8 candidate was written.
        thumbnail_tc: FAIL_FRAME.into(),
        fps: 24,
        offsets: vec![-8, 0, 8],
        encoder: ClipEncoder::default(),
    };

    let result = render_scene_assets(&runner, &request).await;

    assert_matches!(result, Err(PipelineError::CommandFailed { .. }));
    assert!(!dir.path().join("thumbs/scene_02_candidates").exists());
    assert!(!dir.path().join("thumbs/scene_02.webp").exists());
}

#[tokio::test]
async fn poster_falls_back_to_existing_thumbnail_url() {
    let dir = tempfile::tempdir().unwrap();
    let runner = FakeFfmpeg::default();
    let mut failing = scene(1, FAIL_START, "00:01:01.00", "00:01:00.00");
    failing.thumbnail_url = Some("/media/p1/thumbs/board_1/scene_01.webp".into());
    let mut response = StoryboardResponse {
        movie_title: String::new(),
        duration: String::new(),
        storyboards: vec![Storyboard {
            name: "Hype".into(),
            target_length: String::new(),
            tone: String::new(),
            description: String::new(),
            scenes: vec![failing],
        }],
        poster_candidates: None,
    };

    let report = render_storyboards(&runner, "p1", &mut response, &settings_in(dir.path())).await;

    assert_eq!(report.rendered, 0);
    assert_eq!(report.poster_url.as_deref(), Some("/media/p1/thumbs/board_1/scene_01.webp"));
}

fn settings_in(root: &Path) -> RenderSettings {
    RenderSettings {
        project_dir: root.join("p1"),
        input_path: root.join("p1.mp4"),
        media_base_url: "/media".into(),
        fps: 24,
        offsets: vec![0],
        encoder: ClipEncoder::default(),
        workers: 1,
    }
}

fn poster(id: &str, timestamp: &str) -> PosterCandidate {
    PosterCandidate {
        id: id.into(),
        timestamp: timestamp.into(),
        description: None,
        image_url: None,
    }
}

#[tokio::test]
async fn poster_candidates_skip_failures_and_empty_frames() {
    let dir = tempfile::tempdir().unwrap();
    let runner = FakeFfmpeg::default();
    let candidates = vec![
        poster("poster_01", "00:00:05.00"),
        poster("poster_02", FAIL_FRAME),
        poster("poster_03", EMPTY_FRAME),
        poster("poster_04", ""),
        poster("", "00:00:07.00"),
    ];

    let rendered = render_poster_candidates(&runner, "p1", candidates, &settings_in(dir.path())).await;

    let ids: Vec<&str> = rendered.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, ["poster_01", "poster_02"]);
    assert_eq!(
        rendered[0].image_url.as_deref(),
        Some("/media/p1/posters/candidates/poster_01.webp")
    );
    assert_eq!(rendered[1].timestamp, "00:00:07.00");

    let posters_dir = dir.path().join("p1/posters/candidates");
    assert!(posters_dir.join("poster_01.webp").exists());
    assert!(!posters_dir.join("poster_03.webp").exists());
    let leftovers: Vec<_> = std::fs::read_dir(&posters_dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .filter(|name| name.ends_with("_candidates"))
        .collect();
    assert!(leftovers.is_empty(), "scratch dirs left: {leftovers:?}");
}

#[tokio::test]
async fn no_poster_candidates_renders_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let runner = FakeFfmpeg::default();

    let rendered = render_poster_candidates(&runner, "p1", Vec::new(), &settings_in(dir.path())).await;

    assert!(rendered.is_empty());
    assert!(runner.commands.lock().unwrap().is_empty());
    assert!(!dir.path().join("p1/posters").exists());
}
