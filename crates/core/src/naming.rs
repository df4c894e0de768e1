//! Output path naming conventions for pipeline media assets.
//!
//! Every path is deterministic in its inputs so that re-running a step
//! overwrites the previous output instead of duplicating it.

/// Directory holding uploaded source videos.
pub const UPLOADS_DIR: &str = "./uploads";

/// Directory holding extracted scene clips, one subdirectory per project.
pub const CLIPS_DIR: &str = "./clips";

/// Directory holding thumbnail candidates, one subdirectory per project.
pub const THUMBS_DIR: &str = "./thumbs";

/// Path of a project's uploaded source video.
///
/// ```
/// use kino_core::naming::source_video_path;
///
/// assert_eq!(source_video_path("p1"), "./uploads/p1.mp4");
/// ```
pub fn source_video_path(project_id: &str) -> String {
    format!("{UPLOADS_DIR}/{project_id}.mp4")
}

/// Path of an extracted scene clip.
///
/// Convention: `./clips/{project}/sb{storyboard_index}_scene{scene_number}.mp4`
///
/// ```
/// use kino_core::naming::clip_output_path;
///
/// assert_eq!(clip_output_path("p1", 0, 3), "./clips/p1/sb0_scene3.mp4");
/// ```
pub fn clip_output_path(project_id: &str, storyboard_index: usize, scene_number: i64) -> String {
    format!("{CLIPS_DIR}/{project_id}/sb{storyboard_index}_scene{scene_number}.mp4")
}

/// Path of a thumbnail candidate.
///
/// Convention: `./thumbs/{project}/sb{storyboard_index}_scene{scene_number}_{offset}.webp`
/// where `offset` is the signed frame offset as a plain integer (`-8`, `0`, `8`).
///
/// ```
/// use kino_core::naming::thumbnail_output_path;
///
/// assert_eq!(thumbnail_output_path("p1", 1, 2, -8), "./thumbs/p1/sb1_scene2_-8.webp");
/// ```
pub fn thumbnail_output_path(
    project_id: &str,
    storyboard_index: usize,
    scene_number: i64,
    offset: i32,
) -> String {
    format!("{THUMBS_DIR}/{project_id}/sb{storyboard_index}_scene{scene_number}_{offset}.webp")
}

/// Filesystem-safe encoding of a signed offset: `p8`, `m8`, `p0`.
pub fn offset_suffix(offset: i32) -> String {
    if offset < 0 {
        format!("m{}", offset.unsigned_abs())
    } else {
        format!("p{offset}")
    }
}

/// Candidate file name used inside a per-scene scratch directory.
pub fn candidate_filename(offset: i32) -> String {
    format!("thumb_{}.webp", offset_suffix(offset))
}

/// Per-storyboard directory name used by the renderer, numbered from 1.
///
/// ```
/// use kino_core::naming::board_dir_name;
///
/// assert_eq!(board_dir_name(0), "board_1");
/// ```
pub fn board_dir_name(storyboard_index: usize) -> String {
    format!("board_{}", storyboard_index + 1)
}

/// Per-scene clip and thumbnail file names used by the renderer.
///
/// `scene_asset_index` counts from 1 within its storyboard and is
/// zero-padded to two digits: `scene_03.mp4`.
pub fn scene_asset_names(scene_asset_index: usize) -> (String, String) {
    (
        format!("scene_{scene_asset_index:02}.mp4"),
        format!("scene_{scene_asset_index:02}.webp"),
    )
}

/// Project-relative directory of rendered poster candidates.
pub const POSTER_CANDIDATES_DIR: &str = "posters/candidates";

/// Identifier of the `n`-th poster candidate, counting from 1: `poster_07`.
pub fn poster_candidate_id(n: usize) -> String {
    format!("poster_{n:02}")
}

/// Public URL of a rendered asset.
///
/// `relative_path` is relative to the project's media directory; Windows
/// separators are normalized to `/`.
///
/// ```
/// use kino_core::naming::media_url;
///
/// assert_eq!(media_url("/media/", "p1", "clips\\board_1\\scene_01.mp4"), "/media/p1/clips/board_1/scene_01.mp4");
/// ```
pub fn media_url(base_url: &str, project_id: &str, relative_path: &str) -> String {
    let base = base_url.trim_end_matches('/');
    let normalized = relative_path.replace('\\', "/");
    format!("{base}/{project_id}/{normalized}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_path() {
        assert_eq!(source_video_path("abc"), "./uploads/abc.mp4");
    }

    #[test]
    fn clip_path_uses_storyboard_index_and_scene_number() {
        assert_eq!(clip_output_path("abc", 4, 17), "./clips/abc/sb4_scene17.mp4");
    }

    #[test]
    fn thumbnail_path_keeps_offset_sign() {
        assert_eq!(
            thumbnail_output_path("abc", 0, 1, 8),
            "./thumbs/abc/sb0_scene1_8.webp"
        );
        assert_eq!(
            thumbnail_output_path("abc", 0, 1, -8),
            "./thumbs/abc/sb0_scene1_-8.webp"
        );
    }

    #[test]
    fn offset_suffix_encodes_sign() {
        assert_eq!(offset_suffix(8), "p8");
        assert_eq!(offset_suffix(-8), "m8");
        assert_eq!(offset_suffix(0), "p0");
        assert_eq!(offset_suffix(i32::MIN), "m2147483648");
    }

    #[test]
    fn candidate_name() {
        assert_eq!(candidate_filename(-4), "thumb_m4.webp");
    }

    #[test]
    fn scene_asset_names_are_padded() {
        assert_eq!(
            scene_asset_names(3),
            ("scene_03.mp4".to_string(), "scene_03.webp".to_string())
        );
        assert_eq!(scene_asset_names(120).0, "scene_120.mp4");
    }

    #[test]
    fn board_dirs_count_from_one() {
        assert_eq!(board_dir_name(0), "board_1");
        assert_eq!(board_dir_name(4), "board_5");
    }

    #[test]
    fn poster_ids_are_padded() {
        assert_eq!(poster_candidate_id(1), "poster_01");
        assert_eq!(poster_candidate_id(20), "poster_20");
    }

    #[test]
    fn media_url_joins_base_project_and_path() {
        assert_eq!(media_url("/media", "p1", "thumbs/board_2/scene_02.webp"), "/media/p1/thumbs/board_2/scene_02.webp");
        assert_eq!(media_url("https://cdn.example/m//", "p1", "a.mp4"), "https://cdn.example/m/p1/a.mp4");
    }
}
