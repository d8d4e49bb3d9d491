//! End-to-end editing scenarios: typing past a page, deleting back, the
//! only-page rule, formatting and assist previews across a whole chapter.

use folio_core::{
    AssistAction, AssistOutput, AssistSession, Block, Book, ChapterId, CharBudget,
    CommandExecutor, CommandOutcome, Document, EditError, EditingCapability, FormatCommand,
    LineBudget, ModelEditing, NodePosition, Selection, markdown,
};

#[test]
fn typing_past_the_end_of_a_page_creates_the_next_one() {
    let measure = CharBudget::new(20);
    let mut doc = Document::new(ChapterId(1), "Chapter 1");
    let first = doc.push_block(0, Block::paragraph("Once upon a time")).unwrap();
    doc.reconcile(&measure);
    assert_eq!(doc.page_count(), 1);

    let second = doc.push_block(0, Block::paragraph("there was a page")).unwrap();
    let report = doc.reconcile(&measure);
    assert_eq!(doc.page_count(), 2);
    assert_eq!(report.down.pages_created, 1);
    assert_eq!(doc.locate(first), Some((0, 0)));
    assert_eq!(doc.locate(second), Some((1, 0)));
    // The caret follows the content that moved.
    assert_eq!(doc.focus().map(|f| f.page), Some(1));

    doc.remove_block(1, second).unwrap();
    doc.reconcile(&measure);
    assert_eq!(doc.page_count(), 1);
}

#[test]
fn deleting_the_only_page_is_rejected() {
    let mut doc = Document::new(ChapterId(1), "Chapter 1");
    doc.push_block(0, Block::paragraph("content")).unwrap();
    doc.reconcile(&CharBudget::new(100));
    let stored: Vec<String> = doc.stored_content().iter().map(|s| s.to_string()).collect();

    assert_eq!(doc.delete_page(0), Err(EditError::LastPage));
    assert_eq!(doc.stored_content(), stored);
}

#[test]
fn markdown_chapter_paginates_by_lines() {
    let src = "# The Harbour\n\n".to_string()
        + &"The boats came in one by one as the light went down. ".repeat(6)
        + "\n\n- nets\n- rope\n- salt\n\n---\n\nMorning came.\n";
    let mut doc = Document::from_blocks(ChapterId(1), "Chapter 1", markdown::parse_blocks(&src));
    let words = doc.word_count();
    let text = doc.plain_text();

    let measure = LineBudget::new(40, 8);
    let report = doc.reconcile(&measure);
    assert!(report.warnings().next().is_none());
    assert!(doc.page_count() > 1);
    assert_eq!(doc.plain_text(), text);
    assert_eq!(doc.word_count(), words);
    assert!(doc.stored_content().iter().all(|s| !s.is_empty()));
}

#[test]
fn formatting_marks_the_page_for_reflow() {
    let mut doc = Document::from_blocks(
        ChapterId(1),
        "Chapter 1",
        [Block::paragraph("aaaa"), Block::paragraph("bbbb")],
    );
    doc.reconcile(&CharBudget::new(100));
    let ids: Vec<_> = doc.page(0).unwrap().region.nodes().collect();

    let mut exec = CommandExecutor::new(ModelEditing::new());
    exec.capability_mut().set_selection(Some(Selection::new(
        NodePosition::new(ids[0], 0),
        NodePosition::new(ids[1], 4),
    )));
    exec.save_selection(0);
    assert_eq!(
        exec.execute(&mut doc, &FormatCommand::Underline),
        CommandOutcome::Applied { page: 0, native: false }
    );
    assert!(doc.is_dirty(0));
    doc.reconcile(&CharBudget::new(100));
    assert_eq!(doc.stored_content(), vec!["<p><u>aaaa</u></p><p><u>bbbb</u></p>"]);
}

#[test]
fn discarded_preview_leaves_no_trace_after_reflow() {
    let measure = CharBudget::new(30);
    let mut doc = Document::from_blocks(
        ChapterId(1),
        "Chapter 1",
        ["short one", "short two", "short three", "short four"].map(Block::paragraph),
    );
    doc.reconcile(&measure);
    let stored: Vec<String> = doc.stored_content().iter().map(|s| s.to_string()).collect();
    let id = doc.page(0).unwrap().region.leading().unwrap();

    let mut session = AssistSession::new();
    let (ticket, _) = session
        .begin(
            &mut doc,
            AssistAction::Rewrite,
            Some((0, Selection::new(NodePosition::new(id, 0), NodePosition::new(id, 5)))),
            None,
            None,
        )
        .unwrap();
    session.complete(
        &mut doc,
        ticket,
        Ok(AssistOutput::Replacement("a much much longer replacement".into())),
    );
    session.discard(&mut doc);
    doc.reconcile(&measure);
    assert_eq!(doc.stored_content(), stored);
}

#[test]
fn book_snapshot_round_trips() {
    let mut book = Book::new();
    book.active_mut()
        .push_block(0, Block::paragraph("first chapter"))
        .unwrap();
    let second = book.add_chapter();
    book.rename_chapter(second, "Interlude").unwrap();
    book.active_mut()
        .push_block(0, Block::paragraph("second chapter"))
        .unwrap();
    book.active_mut().persist_all();

    let json = serde_json::to_string_pretty(&book).unwrap();
    let back: Book = serde_json::from_str(&json).unwrap();
    assert_eq!(back.chapters().len(), 2);
    assert_eq!(back.active_id(), second);
    assert_eq!(back.chapter(second).unwrap().title, "Interlude");
    assert_eq!(back.word_count(), 4);
    assert_eq!(
        back.chapter(ChapterId(1)).unwrap().stored_content(),
        vec!["<p>first chapter</p>"]
    );
}
