//! Plays a loaded replay back through the simulation

use crate::game::events::MatchEvent;
use crate::game::field::PlayerSlot;
use crate::game::r#match::{GameMatch, MatchMode};
use crate::game::rules::create_rules_from_descriptor;
use crate::game::snapshot::MatchState;

use super::{ReplayError, ReplayLoader};

pub struct ReplayPlayer {
    loader: ReplayLoader,
    game: GameMatch,
    position: u64,
}

impl ReplayPlayer {
    pub fn new(loader: ReplayLoader) -> Result<Self, ReplayError> {
        let rules = create_rules_from_descriptor(loader.rules())?;
        let mut game = GameMatch::new(MatchMode::Playback, rules, loader.enabled_slots());

        let start = loader.save_point(0);
        game.set_state(&start.state);
        let position = start.tick;

        Ok(Self {
            loader,
            game,
            position,
        })
    }

    /// Simulate the next recorded tick. Returns false once the end is reached.
    pub fn play_step(&mut self) -> Result<bool, ReplayError> {
        if self.is_finished() {
            return Ok(false);
        }

        self.sync_roster();
        let inputs = self.loader.input_at(self.position)?;
        for slot in PlayerSlot::ALL {
            if self.game.player_enabled(slot) {
                self.game.input_source_mut(slot).set_input(inputs[slot.index()]);
            }
        }
        self.game.step();
        self.position += 1;
        Ok(true)
    }

    /// Slots that left during the match only show up in savepoints
    fn sync_roster(&mut self) {
        if !self.loader.is_save_point(self.position) {
            return;
        }
        let recorded = self.loader.save_point(self.position).state.physics.enabled;
        for slot in PlayerSlot::ALL {
            if self.game.player_enabled(slot) && !recorded[slot.index()] {
                self.game.set_player_enabled(slot, false);
            }
        }
    }

    /// Jump to `target` by restoring the nearest savepoint and replaying forward
    pub fn seek(&mut self, target: u64) -> Result<(), ReplayError> {
        let target = target.min(self.loader.length());
        let point = self.loader.save_point(target);

        // a slot disabled later in the match may be needed again
        let mut game = GameMatch::new(
            MatchMode::Playback,
            create_rules_from_descriptor(self.loader.rules())?,
            self.loader.enabled_slots(),
        );
        game.set_state(&point.state);
        self.game = game;
        self.position = point.tick;

        while self.position < target {
            self.play_step()?;
        }
        Ok(())
    }

    /// Current tick
    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn is_finished(&self) -> bool {
        self.position >= self.loader.length()
    }

    pub fn state(&self) -> MatchState {
        self.game.state()
    }

    pub fn last_events(&self) -> &[MatchEvent] {
        self.game.last_events()
    }

    pub fn game(&self) -> &GameMatch {
        &self.game
    }

    pub fn loader(&self) -> &ReplayLoader {
        &self.loader
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::field::{Side, MAX_PLAYERS};
    use crate::game::input::RandomInput;
    use crate::game::rules::create_rules;
    use crate::replay::ReplayRecorder;

    const DUEL: [bool; MAX_PLAYERS] = [true, true, false, false];

    fn record_match(ticks: usize) -> (ReplayRecorder, Vec<MatchState>) {
        let rules = create_rules("classic", 15).unwrap();
        let mut game = GameMatch::new(MatchMode::Local, rules, DUEL);
        game.set_input_source(PlayerSlot::Left, Box::new(RandomInput::new(11)));
        game.set_input_source(PlayerSlot::Right, Box::new(RandomInput::new(12)));

        let mut recorder = ReplayRecorder::new(
            DUEL,
            Default::default(),
            [0; MAX_PLAYERS],
            75,
            game.rules_descriptor().clone(),
        );
        let mut states = Vec::with_capacity(ticks + 1);
        for _ in 0..ticks {
            let before = game.state();
            states.push(before);
            game.step();
            recorder.record(&before, &game.applied_inputs());
        }
        states.push(game.state());
        recorder.finalize(game.score(Side::Left), game.score(Side::Right));
        (recorder, states)
    }

    #[test]
    fn playback_follows_the_recorded_match() {
        let (recorder, states) = record_match(1600);
        let loader = ReplayLoader::from_recorder(&recorder).unwrap();
        let mut player = ReplayPlayer::new(loader).unwrap();

        assert_eq!(player.state(), states[0]);
        for expected in &states[1..] {
            assert!(player.play_step().unwrap());
            assert_eq!(&player.state(), expected);
        }
    }

    #[test]
    fn seek_lands_on_the_recorded_state() {
        let (recorder, states) = record_match(1600);
        let mut player = ReplayPlayer::new(ReplayLoader::from_recorder(&recorder).unwrap()).unwrap();

        for target in [1234u64, 10, 760, 1600] {
            player.seek(target).unwrap();
            assert_eq!(player.position(), target);
            assert_eq!(player.state(), states[target as usize]);
        }
    }

    #[test]
    fn playback_stops_after_padding() {
        let (recorder, _) = record_match(20);
        let mut player = ReplayPlayer::new(ReplayLoader::from_recorder(&recorder).unwrap()).unwrap();
        let mut steps = 0;
        while player.play_step().unwrap() {
            steps += 1;
        }
        assert_eq!(steps, 95);
        assert!(player.is_finished());
        assert!(!player.play_step().unwrap());
    }
}
