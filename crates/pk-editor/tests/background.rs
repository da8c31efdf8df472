//! Integration tests: background image lifecycle through the editor.

mod common;

use common::{FakeLoader, init_logging};
use pk_editor::{BackgroundInfo, BackgroundState, Editor, EditorConfig, EditorError};
use pretty_assertions::assert_eq;
use std::cell::RefCell;
use std::rc::Rc;

const BG1: &str = "https://cdn.test/bg/one.png";
const BG2: &str = "https://cdn.test/bg/two.png";

fn loader() -> FakeLoader {
    FakeLoader::new()
        .with(BG1, 2400.0, 1800.0)
        .with(BG2, 600.0, 1200.0)
}

fn editor() -> Editor {
    init_logging();
    Editor::new(EditorConfig::default()).unwrap()
}

fn background_count(ed: &Editor) -> usize {
    ed.scene()
        .objects()
        .iter()
        .filter(|o| o.is_background())
        .count()
}

// ─── Exclusivity & placement ─────────────────────────────────────────────

#[tokio::test]
async fn second_background_replaces_first() {
    let mut ed = editor();
    let loader = loader();
    ed.set_background_image(BG1, false, &loader).await.unwrap();
    ed.set_background_image(BG2, false, &loader).await.unwrap();

    assert_eq!(background_count(&ed), 1);
    assert_eq!(
        ed.background_image_info().background_image_url.as_deref(),
        Some(BG2)
    );
    assert!(ed.scene().objects()[1].is_background());
}

#[tokio::test]
async fn background_fits_page_and_sits_above_workspace() {
    let mut ed = editor();
    ed.add_text("headline", None, None).unwrap();
    ed.set_background_image(BG2, false, &loader()).await.unwrap();

    let bg = ed.scene().background().unwrap();
    assert_eq!(ed.scene().index_of(bg.id), Some(1));
    // 600x1200 on a 1200x900 page: width fit overflows, so height wins.
    assert_eq!(bg.transform.scale_x, 0.75);
    assert_eq!(bg.scaled_size(), (450.0, 900.0));
    assert_eq!((bg.transform.left, bg.transform.top), (0.0, 0.0));
}

#[tokio::test]
async fn failed_load_leaves_no_background() {
    let mut ed = editor();
    let loader = loader();
    ed.set_background_image(BG1, false, &loader).await.unwrap();
    let err = ed
        .set_background_image("https://cdn.test/missing.png", false, &loader)
        .await
        .unwrap_err();
    assert!(matches!(err, EditorError::AssetFailure(_)));
    assert_eq!(background_count(&ed), 0);
    assert_eq!(ed.background_image_info().background_image_url, None);
}

// ─── Locking ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn locked_background_geometry_is_immutable() {
    let mut ed = editor();
    ed.set_background_image(BG1, false, &loader()).await.unwrap();
    let id = ed.scene().background().unwrap().id;
    assert!(ed.select(id));

    assert!(ed.set_background_image_lock(true).unwrap());
    assert!(ed.selection().is_empty());
    let before = ed.scene().get(id).unwrap().transform;

    assert!(!ed.move_object(id, 30.0, 40.0).unwrap());
    assert!(!ed.scale_object(id, 2.0, 2.0).unwrap());
    assert!(!ed.select(id));
    assert_eq!(ed.delete_selected().unwrap(), 0);
    assert_eq!(ed.scene().get(id).unwrap().transform, before);

    assert!(ed.remove_background_image().unwrap());
    assert_eq!(background_count(&ed), 0);
}

#[tokio::test]
async fn unlocking_restores_editing() {
    let mut ed = editor();
    ed.set_background_image(BG1, true, &loader()).await.unwrap();
    let id = ed.scene().background().unwrap().id;
    assert!(!ed.move_object(id, 5.0, 0.0).unwrap());

    ed.set_background_image_lock(false).unwrap();
    assert!(ed.move_object(id, 5.0, 0.0).unwrap());
    assert!(ed.select(id));
    assert_eq!(ed.delete_selected().unwrap(), 1);
    assert_eq!(ed.background_image_info().background_image_url, None);
}

#[test]
fn lock_without_background_is_a_no_op() {
    let mut ed = editor();
    assert!(!ed.set_background_image_lock(true).unwrap());
    assert!(!ed.remove_background_image().unwrap());
    assert!(!ed.can_undo());
}

// ─── Resize ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn change_size_rescales_by_smaller_ratio() {
    let mut ed = editor();
    ed.set_background_image(BG1, true, &loader()).await.unwrap();
    ed.change_size(600.0, 900.0).unwrap();

    let bg = ed.scene().background().unwrap();
    assert_eq!(bg.transform.scale_x, 0.25);
    assert_eq!(bg.transform.scale_y, 0.25);
    assert_eq!((bg.transform.left, bg.transform.top), (0.0, 0.0));
    assert!(ed.background_image_info().is_locked);
}

// ─── Listener ────────────────────────────────────────────────────────────

#[tokio::test]
async fn listener_sees_every_transition_and_last_wins() {
    let mut ed = editor();
    let first = Rc::new(RefCell::new(Vec::<BackgroundInfo>::new()));
    let second = Rc::new(RefCell::new(Vec::<BackgroundInfo>::new()));

    let sink = Rc::clone(&first);
    ed.set_background_state_change_listener(Some(Box::new(move |info: &BackgroundInfo| {
        sink.borrow_mut().push(info.clone());
    })));
    ed.set_background_image(BG1, false, &loader()).await.unwrap();

    let sink = Rc::clone(&second);
    ed.set_background_state_change_listener(Some(Box::new(move |info: &BackgroundInfo| {
        sink.borrow_mut().push(info.clone());
    })));
    ed.set_background_image_lock(true).unwrap();
    ed.remove_background_image().unwrap();

    assert_eq!(first.borrow().len(), 1);
    assert_eq!(first.borrow()[0].width, 2400.0);
    let states: Vec<_> = second
        .borrow()
        .iter()
        .map(|i| (i.background_image_url.is_some(), i.is_locked))
        .collect();
    assert_eq!(states, vec![(true, true), (false, false)]);

    ed.set_background_state_change_listener(None);
    ed.set_background_image(BG2, false, &loader()).await.unwrap();
    assert_eq!(second.borrow().len(), 2);
}

// ─── Undo & persistence ──────────────────────────────────────────────────

#[tokio::test]
async fn undo_resyncs_background_state() {
    let mut ed = editor();
    ed.set_background_image(BG1, false, &loader()).await.unwrap();
    ed.set_background_image_lock(true).unwrap();

    ed.undo().unwrap();
    assert!(!ed.background_image_info().is_locked);
    ed.undo().unwrap();
    assert_eq!(ed.background_image_info().background_image_url, None);
    ed.redo().unwrap();
    ed.redo().unwrap();
    assert!(ed.background_image_info().is_locked);
}

#[tokio::test]
async fn reload_restores_lock_image_and_geometry() {
    let mut ed = editor();
    let loader = loader();
    ed.set_background_image(BG1, true, &loader).await.unwrap();
    ed.change_size(800.0, 800.0).unwrap();
    let json = ed.to_json().unwrap();
    let saved = ed.scene().background().unwrap().transform;

    let reopened = Editor::from_document(EditorConfig::default(), &json, &loader)
        .await
        .unwrap();
    let info = reopened.background_image_info();
    assert_eq!(info.background_image_url.as_deref(), Some(BG1));
    assert!(info.is_locked);
    assert_eq!(reopened.background_state(), BackgroundState::Locked);
    let bg = reopened.scene().background().unwrap();
    assert_eq!(bg.transform, saved);
    assert!(!bg.flags.selectable);
    assert_eq!(reopened.history().len(), 1);
}

#[tokio::test]
async fn reload_with_unreachable_image_drops_background() {
    let mut ed = editor();
    ed.set_background_image(BG1, false, &loader()).await.unwrap();
    ed.add_text("keep me", None, None).unwrap();
    let json = ed.to_json().unwrap();

    let reopened = Editor::from_document(EditorConfig::default(), &json, &FakeLoader::new())
        .await
        .unwrap();
    assert!(reopened.scene().background().is_none());
    assert_eq!(reopened.background_image_info().background_image_url, None);
    assert!(
        reopened
            .scene()
            .objects()
            .iter()
            .any(|o| o.text() == Some("keep me"))
    );
    assert_eq!(reopened.background_state(), BackgroundState::Absent);
}
