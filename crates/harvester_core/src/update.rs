use crate::{
    ElementRef, ErrorKind, HarvestEffect, HarvestMsg, HarvestPhase, HarvestState, Item,
    StopReason, Window,
};

/// Pure update function: applies a message to state and returns any effects.
///
/// Every effect yields exactly one message. Once the state is terminal
/// (`Done` or `Interrupted`) further messages are ignored and no effects
/// are produced.
pub fn update(mut state: HarvestState, msg: HarvestMsg) -> (HarvestState, Vec<HarvestEffect>) {
    if state.is_terminal() {
        return (state, Vec::new());
    }

    let effects = match msg {
        HarvestMsg::Begin => {
            state.phase = HarvestPhase::LoadFeed;
            vec![HarvestEffect::OpenFeed]
        }
        HarvestMsg::FeedOpened { declared } => {
            state.declared = declared;
            if declared == 0 {
                state.finish(StopReason::Complete);
                Vec::new()
            } else {
                vec![HarvestEffect::ReadWindow]
            }
        }
        HarvestMsg::WindowRead(window) => on_window(&mut state, window),
        HarvestMsg::ItemExtracted(item) => on_item(&mut state, item),
        HarvestMsg::ElementStale { element } => {
            take_pending(&mut state, element);
            state.skipped += 1;
            // Re-poll: the window moved under us, resync before going on.
            vec![HarvestEffect::ReadWindow]
        }
        HarvestMsg::Evicted { count, new_head } => {
            state.tracker.record_eviction(count, new_head);
            load_more(&state)
        }
        HarvestMsg::EvictionSkipped => load_more(&state),
        HarvestMsg::TailChanged => vec![HarvestEffect::ReadWindow],
        HarvestMsg::TailTimedOut => {
            exhausted(&mut state);
            Vec::new()
        }
        HarvestMsg::Failed { kind, message } => {
            state.interrupt(kind, message);
            Vec::new()
        }
    };

    (state, effects)
}

/// Window reads in a row that bring nothing new before the feed counts as exhausted.
const MAX_IDLE_POLLS: u32 = 3;

fn on_window(state: &mut HarvestState, window: Window) -> Vec<HarvestEffect> {
    let first_read = !state.window_seen;
    state.window_seen = true;
    if first_read && window.is_empty() {
        state.interrupt(ErrorKind::FeedNotLoading, "feed rendered no elements");
        return Vec::new();
    }

    let fresh = state.tracker.poll_new_elements(&window);
    if fresh.is_empty() && state.pending.is_empty() {
        state.idle_polls += 1;
        if state.idle_polls >= MAX_IDLE_POLLS {
            exhausted(state);
            return Vec::new();
        }
    } else {
        state.idle_polls = 0;
    }
    state.pending.extend(fresh);
    state.phase = HarvestPhase::Expanding;
    next_step(state)
}

fn on_item(state: &mut HarvestState, item: Item) -> Vec<HarvestEffect> {
    take_pending(state, ElementRef(item.id));

    if !state.policy.admits(&item) {
        state.finish(StopReason::PolicyCutoff { at: item.id });
        return Vec::new();
    }
    if state.items.last().is_none_or(|last| item.id > last.id) {
        state.items.push(item);
    }
    next_step(state)
}

/// Removes `element` from the front of the pending queue and counts it as consumed.
fn take_pending(state: &mut HarvestState, element: ElementRef) {
    if state.pending.front() == Some(&element) {
        state.pending.pop_front();
    } else {
        state.pending.retain(|pending| *pending != element);
    }
    state.consumed += 1;
    state.tracker.mark_processed(element.id());
}

fn next_step(state: &mut HarvestState) -> Vec<HarvestEffect> {
    if state.consumed >= state.declared {
        state.finish(StopReason::Complete);
        return Vec::new();
    }
    match state.pending.front() {
        Some(element) => vec![HarvestEffect::Extract(*element)],
        None => stop_check(state),
    }
}

/// End of a batch: report progress, evict what is no longer needed, load more.
fn stop_check(state: &mut HarvestState) -> Vec<HarvestEffect> {
    state.phase = HarvestPhase::StopCheck;
    state.mark_dirty();
    if state.consumed >= state.declared {
        state.finish(StopReason::Complete);
        return Vec::new();
    }

    match state.tracker.plan_eviction() {
        Some(eviction) => {
            state.phase = HarvestPhase::Evicting;
            vec![HarvestEffect::Evict(eviction)]
        }
        None => load_more(state),
    }
}

fn exhausted(state: &mut HarvestState) {
    let reason = StopReason::Exhausted {
        consumed: state.consumed,
        declared: state.declared,
    };
    state.finish(reason);
}

/// Keeps the current phase; the next window read moves back to `Expanding`.
fn load_more(state: &HarvestState) -> Vec<HarvestEffect> {
    vec![HarvestEffect::LoadMore {
        previous_tail: state.tracker.tail(),
    }]
}
