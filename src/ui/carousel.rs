use iced::widget::{button, column, container, image, row, scrollable, text, text_input, Space};
use iced::{Alignment, Color, Element, Length};
use std::collections::HashMap;

use super::{PreviewKey, PreviewState};
use crate::archive::preview::{TIER_CURRENT, TIER_NEIGHBOR};
use crate::dates;
use crate::state::carousel::{CarouselState, LoadPhase};
use crate::state::slot::{SlotPosition, SlotValue};
use crate::Message;

/// Slot widths in logical pixels
const NEIGHBOR_WIDTH: f32 = 220.0;
const CURRENT_WIDTH: f32 = 560.0;

const ERROR_COLOR: Color = Color {
    r: 0.95,
    g: 0.45,
    b: 0.45,
    a: 1.0,
};

/// Preview tier each slot is rendered at
pub fn tier_for(position: SlotPosition) -> u32 {
    match position {
        SlotPosition::Current => TIER_CURRENT,
        SlotPosition::Before | SlotPosition::Next => TIER_NEIGHBOR,
    }
}

/// Full browsing screen: date bar, three slots, title and body
pub fn view<'a>(
    state: &'a CarouselState,
    previews: &'a HashMap<PreviewKey, PreviewState>,
    date_input: &'a str,
    date_notice: Option<&'a str>,
    can_change_key: bool,
) -> Element<'a, Message> {
    let slots = row![
        slot_card(SlotPosition::Before, state, previews),
        slot_card(SlotPosition::Current, state, previews),
        slot_card(SlotPosition::Next, state, previews),
    ]
    .spacing(20)
    .align_y(Alignment::Center);

    let title = text(&state.title).size(28);
    let title = if state.phase == LoadPhase::Failed {
        title.color(ERROR_COLOR)
    } else {
        title
    };

    let mut content = column![
        date_bar(state, date_input, date_notice, can_change_key),
        slots,
        title,
        scrollable(text(&state.body).size(16)).height(Length::Fixed(180.0)),
    ]
    .spacing(20)
    .padding(30)
    .align_x(Alignment::Center);

    if let Some(url) = &state.hd_url {
        content = content.push(text(format!("Full resolution: {}", url)).size(12));
    }

    container(content)
        .width(Length::Fill)
        .height(Length::Fill)
        .center_x(Length::Fill)
        .into()
}

/// Date picker with day stepping; the maximum is today
fn date_bar<'a>(
    state: &'a CarouselState,
    date_input: &'a str,
    notice: Option<&'a str>,
    can_change_key: bool,
) -> Element<'a, Message> {
    let can_step_forward = state.center_date < state.today;

    let controls = row![
        button("‹ Previous day").on_press(Message::StepDay(-1)).padding(8),
        text_input("YYYY-MM-DD", date_input)
            .on_input(Message::DateInput)
            .on_submit(Message::DateSubmitted)
            .width(Length::Fixed(140.0))
            .padding(8),
        button("Show").on_press(Message::DateSubmitted).padding(8),
        button("Next day ›")
            .on_press_maybe(can_step_forward.then_some(Message::StepDay(1)))
            .padding(8),
        Space::with_width(Length::Fixed(24.0)),
        button("Reload").on_press(Message::Reload).style(button::secondary).padding(8),
        button("Change key")
            .on_press_maybe(can_change_key.then_some(Message::ChangeKey))
            .style(button::secondary)
            .padding(8),
    ]
    .spacing(10)
    .align_y(Alignment::Center);

    let hint = match notice {
        Some(notice) => text(notice).size(14).color(ERROR_COLOR),
        None => text(format!("Latest: {}", dates::format(state.today))).size(14),
    };

    column![controls, hint].spacing(6).align_x(Alignment::Center).into()
}

/// One slot; before/next are clickable when they carry a date
fn slot_card<'a>(
    position: SlotPosition,
    state: &'a CarouselState,
    previews: &'a HashMap<PreviewKey, PreviewState>,
) -> Element<'a, Message> {
    let slot = state.slot(position);
    let width = match position {
        SlotPosition::Current => CURRENT_WIDTH,
        SlotPosition::Before | SlotPosition::Next => NEIGHBOR_WIDTH,
    };

    let preview = slot.display_ref().and_then(|reference| {
        previews.get(&PreviewKey {
            reference,
            tier: tier_for(position),
        })
    });

    let picture: Element<'a, Message> = match (slot, preview) {
        (SlotValue::Empty, _) => text("Loading…").size(14).into(),
        (_, Some(PreviewState::Ready(handle))) => image(handle.clone()).width(Length::Fixed(width)).into(),
        (_, Some(PreviewState::Failed)) => text(slot.alt_text()).size(14).into(),
        (_, _) => text("Loading preview…").size(14).into(),
    };

    let caption = match slot {
        SlotValue::Populated { source_date, .. } => {
            let date = dates::format(*source_date);
            if position == SlotPosition::Next && state.next_is_substitute {
                format!("{} (random pick)", date)
            } else {
                date
            }
        }
        SlotValue::Fallback { alt_text, .. } => alt_text.clone(),
        SlotValue::Empty => String::new(),
    };

    let card = column![picture, text(caption).size(14)]
        .spacing(8)
        .align_x(Alignment::Center)
        .width(Length::Fixed(width));

    let on_press = match position {
        SlotPosition::Current => None,
        SlotPosition::Before | SlotPosition::Next => {
            slot.navigable_date().map(|_| Message::SlotClicked(position))
        }
    };

    button(card)
        .on_press_maybe(on_press)
        .style(button::text)
        .padding(6)
        .into()
}
