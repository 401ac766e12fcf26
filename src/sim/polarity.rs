//! Red/blue polarity of the player and blocks

use serde::{Deserialize, Serialize};

use super::state::{BlockId, GameEvent, GameState, PolarityTarget};

/// Magnetic polarity tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Polarity {
    Red,
    #[default]
    Blue,
}

impl Polarity {
    pub fn from_is_red(is_red: bool) -> Self {
        if is_red { Polarity::Red } else { Polarity::Blue }
    }

    pub fn is_red(self) -> bool {
        self == Polarity::Red
    }

    pub fn toggled(self) -> Self {
        match self {
            Polarity::Red => Polarity::Blue,
            Polarity::Blue => Polarity::Red,
        }
    }

    /// Same polarity pushes apart, different polarity pulls together
    pub fn matches(a: Polarity, b: Polarity) -> bool {
        a == b
    }
}

/// Flip the player's polarity and tell the presentation layer
pub fn toggle_player(state: &mut GameState) -> Polarity {
    let polarity = state.player.polarity.toggled();
    state.player.polarity = polarity;
    state.events.push(GameEvent::PolarityChanged {
        target: PolarityTarget::Player,
        polarity,
    });
    polarity
}

/// Flip one block's polarity. Returns `None` if the block is no longer live.
pub fn toggle_block(state: &mut GameState, id: BlockId) -> Option<Polarity> {
    let block = state.world.state.blocks.iter_mut().find(|b| b.id == id)?;
    block.polarity = block.polarity.toggled();
    let polarity = block.polarity;
    state.events.push(GameEvent::PolarityChanged {
        target: PolarityTarget::Block(id),
        polarity,
    });
    Some(polarity)
}
