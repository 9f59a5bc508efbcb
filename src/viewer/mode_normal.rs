//! Normal mode handler: scrolling, jumping, refresh.

use log::debug;

use super::Effect;
use super::input::Action;
use super::state::ExitReason;

pub(super) struct NormalCtx {
    pub top: usize,
    pub max_top: usize,
    pub scroll_step: usize,
    pub page: usize,
}

impl NormalCtx {
    fn half_page(&self) -> usize {
        (self.page / 2).max(1)
    }

    fn down(&self, rows: usize) -> usize {
        self.top.saturating_add(rows).min(self.max_top)
    }
}

pub(super) fn handle(action: Action, ctx: &NormalCtx) -> Vec<Effect> {
    match action {
        Action::Quit => vec![Effect::Exit(ExitReason::Quit)],

        Action::CancelInput | Action::Digit => vec![Effect::RedrawStatusBar],

        Action::ScrollDown(count) => scroll(ctx, ctx.down(count as usize * ctx.scroll_step)),
        Action::ScrollUp(count) => {
            scroll(ctx, ctx.top.saturating_sub(count as usize * ctx.scroll_step))
        }
        Action::HalfPageDown(count) => scroll(ctx, ctx.down(count as usize * ctx.half_page())),
        Action::HalfPageUp(count) => {
            scroll(ctx, ctx.top.saturating_sub(count as usize * ctx.half_page()))
        }
        Action::PageDown(count) => scroll(ctx, ctx.down(count as usize * ctx.page)),
        Action::PageUp(count) => scroll(ctx, ctx.top.saturating_sub(count as usize * ctx.page)),

        Action::JumpToTop => scroll(ctx, 0),
        Action::JumpToBottom => scroll(ctx, ctx.max_top),
        Action::JumpToRow(n) => scroll(ctx, (n as usize).saturating_sub(1).min(ctx.max_top)),

        Action::Refresh => vec![Effect::Refresh, Effect::RedrawStatusBar],
    }
}

fn scroll(ctx: &NormalCtx, top: usize) -> Vec<Effect> {
    if top == ctx.top {
        return vec![Effect::RedrawStatusBar];
    }
    debug!("scroll: top {} → {top} (max={})", ctx.top, ctx.max_top);
    vec![Effect::ScrollTo(top)]
}
