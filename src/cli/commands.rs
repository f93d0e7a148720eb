// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

use std::path::Path;

use crate::cli::args::{InfoArgs, LabelArgs, ShowArgs};
use crate::error::{AnnotationError, Result};
use crate::{AnnotationSession, SaveOutcome, SessionConfig, VERSION};
use crate::{info, section, success, verbose, warn};

fn open_session(output: &Path) -> Result<AnnotationSession> {
    let mut session = AnnotationSession::new(SessionConfig::default());
    session.open_output_dir(output)?;
    Ok(session)
}

/// Print dataset statistics and the labeled frames.
///
/// # Errors
///
/// Returns an error if the output directory cannot be created.
pub fn run_info(args: &InfoArgs) -> Result<()> {
    let mut session = AnnotationSession::new(SessionConfig::default());
    match session.open_output_dir(&args.output) {
        Ok(()) => {}
        Err(e @ AnnotationError::CorruptAnnotationsFile(_)) => warn!("{e}"),
        Err(e) => return Err(e),
    }

    let dataset = session.dataset();
    verbose!("pose-annotator {VERSION}");
    section!("Dataset");
    info!("Output:      {}", args.output.display());
    info!("Description: {}", dataset.info().description);
    info!("Created:     {}", dataset.info().date_created);
    info!("Records:     {}", dataset.len());
    info!("Next ID:     {}", dataset.next_id());

    let frames = session.labeled_frames();
    if frames.is_empty() {
        info!("No labeled frames");
        return Ok(());
    }
    section!("Labeled frames");
    for frame in &frames {
        info!("{frame}");
    }
    Ok(())
}

/// Label one frame and save it.
///
/// # Errors
///
/// Returns an error if the dataset is corrupt, the source or frame cannot be
/// read, a keypoint name is unknown, or the save fails.
pub fn run_label(args: &LabelArgs) -> Result<()> {
    let mut session = open_session(&args.output)?;

    let input = args
        .video
        .as_ref()
        .or(args.frames.as_ref())
        .ok_or_else(|| AnnotationError::FrameUnavailable("No input given".to_string()))?;
    session.open_source_path(input)?;
    session.seek_frame(args.frame)?;

    if args.clear_all {
        session.clear_all();
    }
    for name in &args.clear {
        session.clear_point(name)?;
    }
    for point in &args.points {
        session.set_point(&point.name, point.x, point.y, point.visibility)?;
        verbose!(
            "{} = ({:.1}, {:.1}) [{}]",
            point.name,
            point.x,
            point.y,
            point.visibility
        );
    }

    if let Some(summary) = session.frame_summary() {
        section!("Frame");
        info!("{summary}");
    }

    let outcome = session.save_current(|prompt| {
        if args.yes {
            verbose!("{prompt} Overwriting.");
            true
        } else {
            warn!("{prompt} Re-run with --yes to overwrite.");
            false
        }
    })?;

    match outcome {
        SaveOutcome::Created { image_id } => {
            success!("Created annotation (ID: {image_id})");
        }
        SaveOutcome::Updated { image_id } => {
            success!("Updated annotation (ID: {image_id})");
        }
        SaveOutcome::Declined => {
            info!("Nothing saved");
        }
    }
    Ok(())
}

/// Replay a saved record and print its summary and bones.
///
/// # Errors
///
/// Returns an error if the record does not exist or its frame cannot be read.
pub fn run_show(args: &ShowArgs) -> Result<()> {
    let mut session = open_session(&args.output)?;
    if let Some(video) = &args.video {
        session.open_source_path(video)?;
    }
    session.load_record(args.image_id)?;

    if let Some(summary) = session.frame_summary() {
        section!("Frame");
        info!("{summary}");
    }
    if let Some(frame) = session.current_frame() {
        verbose!("Size: {}x{} @ {:.2} fps", frame.width, frame.height, frame.fps);
    }

    let schema = session.schema();
    let keypoints = session.current_keypoints();
    section!("Keypoints");
    for (name, kp) in keypoints.labeled() {
        info!("{name}: ({:.1}, {:.1}) {}", kp.x, kp.y, kp.visibility);
    }

    section!("Skeleton");
    for bone in session.renderable_bones() {
        info!(
            "{} - {}",
            schema.name_at(bone.from).unwrap_or("?"),
            schema.name_at(bone.to).unwrap_or("?")
        );
    }
    Ok(())
}
