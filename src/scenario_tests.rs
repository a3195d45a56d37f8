//! Whole games, driven through [`GameSession`] with scripted or console players.

use crate::board::{sample_map_data, Board, RouteId};
use crate::card::{CardColor, CardDealer, DeckService, TransportCard, TransportMode};
use crate::config::RulesConfig;
use crate::destination_card;
use crate::error::RulesError;
use crate::interaction::{ConsoleInteraction, ScriptedInteraction};
use crate::player::{PlayerAction, PlayerColor};
use crate::session::{GamePhase, GameSession, PlayerSetup};
use crate::turn::{TurnAction, TurnOutcome};

use pretty_assertions::assert_eq;
use rand::SeedableRng;

const BLUE_WAGON: TransportCard = TransportCard::new(CardColor::Blue, TransportMode::Wagon);
const RED_WAGON: TransportCard = TransportCard::new(CardColor::Red, TransportMode::Wagon);
const GREEN_BOAT: TransportCard = TransportCard::new(CardColor::Green, TransportMode::Boat);

fn players() -> Vec<PlayerSetup> {
    vec![
        PlayerSetup::new("Ada", PlayerColor::Green),
        PlayerSetup::new("Grace", PlayerColor::Yellow),
    ]
}

/// Both players are dealt 3 blue wagons and 7 green boats. Four red wagons are left to draw.
///
/// Ada is offered Dakar - Marseille, Marseille - Lima, Sydney - Marseille, Lima - Lagos and
/// Lagos - Tokyo. Grace is then offered Tokyo - Lagos, Lima - Sydney, and what Ada returned.
fn session(config: RulesConfig) -> GameSession {
    let map = sample_map_data();
    let mut wagons = vec![RED_WAGON; 4];
    wagons.extend([BLUE_WAGON; 6]);
    let deck = CardDealer::from_decks(
        wagons,
        vec![GREEN_BOAT; 14],
        vec![
            destination_card!("Lima", "Sydney", 11),
            destination_card!("Tokyo", "Lagos", 12),
            destination_card!("Lagos", "Tokyo", 9),
            destination_card!("Lima", "Lagos", 8),
            destination_card!("Sydney", "Marseille", 10),
            destination_card!("Marseille", "Lima", 7),
            destination_card!("Dakar", "Marseille", 5),
        ],
    );

    GameSession::new(players(), Board::new(&map).unwrap(), deck, config).unwrap()
}

/// Ada keeps Dakar - Marseille, Lima - Lagos and Lagos - Tokyo.
/// Grace keeps Tokyo - Lagos, Lima - Sydney and Marseille - Lima.
fn setup_answers<'a>(wagons: &'a str, boats: &'a str) -> Vec<&'a str> {
    vec![
        "Marseille - Lima (7)",
        "Sydney - Marseille (10)",
        wagons,
        boats,
        "Sydney - Marseille (10)",
        wagons,
        boats,
    ]
}

#[test]
fn capture_blue_land_route_with_three_wagons() {
    // Exactly 3 wagons and 50 boats can be allocated.
    let config = RulesConfig {
        max_tokens: 53,
        max_wagon_reserve: 3,
        ..RulesConfig::default()
    };
    let mut session = session(config);
    let mut interaction = ScriptedInteraction::new(setup_answers("3", "50"));
    session.setup(&mut interaction).unwrap();

    let grace_before = session.snapshot(1).players[1].clone();
    let cards_before = session.deck().get_state();

    interaction.push([
        "capture-route",
        "R4: Marseille - Dakar (3 blue wagon)",
        "blue wagon",
        "blue wagon",
        "blue wagon",
    ]);
    assert_eq!(
        session.play_turn(&mut interaction),
        Ok(TurnOutcome::Committed(TurnAction::CaptureRoute))
    );

    let route = session.board().route(RouteId(4)).unwrap();
    assert_eq!(route.claimer(), Some(0));

    let ada = session.player(0).unwrap();
    assert_eq!(ada.hand().count(BLUE_WAGON), 0);
    assert_eq!(ada.hand().sorted_cards(), vec![GREEN_BOAT; 7]);
    assert_eq!(ada.tokens().active(TransportMode::Wagon), 0);
    assert_eq!(ada.tokens().pool(TransportMode::Wagon).placed, 3);
    assert_eq!(ada.score(), 3);
    assert_eq!(ada.turn_actions().actions.as_slice(), &[PlayerAction::CapturedRoute]);

    // Nobody else was touched, and the cards paid left play.
    assert_eq!(session.snapshot(1).players[1], grace_before);
    assert_eq!(session.deck().get_state(), cards_before);

    // The route is no longer offered to Grace, although she holds three blue wagons too.
    assert_eq!(
        session.board().check_claimable(RouteId(4)).err(),
        Some(RulesError::AlreadyOwned(RouteId(4)))
    );
    interaction.push([
        "capture-route",
        "R4: Marseille - Dakar (3 blue wagon)",
        "",
        "draw-cards",
        "wagon",
        "",
    ]);
    assert_eq!(
        session.play_turn(&mut interaction),
        Ok(TurnOutcome::Committed(TurnAction::DrawCards))
    );
    assert_eq!(session.board().route(RouteId(4)).unwrap().claimer(), Some(0));
    assert_eq!(session.player(1).unwrap().hand().count(BLUE_WAGON), 3);
}

#[test]
fn allocation_with_wrong_total_is_asked_again() {
    let mut session = session(RulesConfig::default());
    let mut interaction = ScriptedInteraction::new([
        "Marseille - Lima (7)",
        "Sydney - Marseille (10)",
        "10",
        "40",
        "10",
        "50",
        "Sydney - Marseille (10)",
        "25",
        "35",
    ]);

    assert_eq!(session.setup(&mut interaction), Ok(()));

    let wagon_prompts = interaction
        .prompts()
        .iter()
        .filter(|prompt| prompt.contains("how many wagons"))
        .count();
    assert_eq!(wagon_prompts, 3);

    let ada = session.player(0).unwrap();
    assert_eq!(ada.tokens().active(TransportMode::Wagon), 10);
    assert_eq!(ada.tokens().active(TransportMode::Boat), 50);
    assert_eq!(ada.tokens().reserve(TransportMode::Wagon), 15);
    assert_eq!(ada.tokens().reserve(TransportMode::Boat), 0);
}

#[test]
fn initial_destinations_keep_three_of_five() {
    let mut session = session(RulesConfig::default());
    let mut interaction = ScriptedInteraction::new(setup_answers("10", "50"));
    session.setup(&mut interaction).unwrap();

    // 7 destinations: 3 kept by each player, the one returned by Grace is left.
    assert_eq!(session.deck().destinations_left(), 1);
    assert_eq!(
        session.deck().get_destination_card_deck().front(),
        Some(&destination_card!("Sydney", "Marseille", 10))
    );
    assert_eq!(
        session.player(0).unwrap().destination_cards(),
        &[
            destination_card!("Dakar", "Marseille", 5),
            destination_card!("Lima", "Lagos", 8),
            destination_card!("Lagos", "Tokyo", 9),
        ]
    );
    assert_eq!(
        session.player(1).unwrap().destination_cards(),
        &[
            destination_card!("Tokyo", "Lagos", 12),
            destination_card!("Lima", "Sydney", 11),
            destination_card!("Marseille", "Lima", 7),
        ]
    );
}

#[test]
fn low_tokens_trigger_last_turns() {
    // 8 tokens, split as 3 wagons and 5 boats: a single capture brings Ada under the threshold.
    let config = RulesConfig {
        max_tokens: 8,
        max_wagon_reserve: 4,
        max_boat_reserve: 8,
        ..RulesConfig::default()
    };
    let mut session = session(config);

    let mut answers = setup_answers("3", "5");
    answers.extend([
        // Ada: 5 tokens left, everyone plays one last turn.
        "capture-route",
        "R4: Marseille - Dakar (3 blue wagon)",
        "blue wagon",
        "blue wagon",
        "blue wagon",
        // Grace.
        "capture-route",
        "R3: Lagos - Marseille (4 green boat)",
        "green boat",
        "green boat",
        "green boat",
        "green boat",
        // Ada again, for the last time.
        "draw-cards",
        "wagon",
        "wagon",
    ]);
    let mut interaction = ScriptedInteraction::new(answers);

    // Ada: 3 for R4, +5 for Dakar - Marseille, -8 and -9 for the others, -12 for unbuilt ports.
    // Grace: 4 for R3, -12, -11 and -7 for her destinations, -12 for unbuilt ports.
    assert_eq!(session.run(&mut interaction), Ok(vec![(0, -21), (1, -38)]));
    assert_eq!(interaction.remaining(), 0);
    assert_eq!(session.phase(), GamePhase::Done);

    let snapshot = session.snapshot(0);
    assert_eq!(snapshot.turn, Some(2));
    assert_eq!(snapshot.players[0].complete_destinations.len(), 1);
    assert_eq!(
        snapshot.players[0].turn_actions.description.as_slice(),
        &[String::from("Ada drew 2 wagon cards and 0 boat cards.")]
    );
    assert_eq!(snapshot.players[1].hand, None);

    for player in session.players() {
        assert_eq!(player.tokens().check_invariants(), Ok(()));
        for (mode, total) in [(TransportMode::Wagon, 4), (TransportMode::Boat, 8)] {
            let pool = player.tokens().pool(mode);
            assert_eq!(pool.active + pool.reserve + pool.placed, total);
        }
    }
}

#[test]
fn setup_from_the_console() {
    let map = sample_map_data();
    let mut rng = rand::rngs::StdRng::seed_from_u64(42);
    let mut session =
        GameSession::standard(players(), &map, RulesConfig::default(), &mut rng).unwrap();

    // Options are picked by number: whatever was drawn, return the first ones offered.
    let input = b"1\n1\ntwenty\n20\n40\n1\n25\n35\n" as &[u8];
    let mut output = Vec::new();
    let mut interaction = ConsoleInteraction::new(input, &mut output);

    assert_eq!(session.setup(&mut interaction), Ok(()));
    drop(interaction);

    assert_eq!(session.phase(), GamePhase::Playing);
    for player in session.players() {
        assert_eq!(player.destination_cards().len(), 3);
        assert_eq!(player.hand().len(), 10);
        assert!(player.tokens().is_allocated());
    }

    let output = String::from_utf8(output).unwrap();
    assert!(output.contains("Ada, how many wagons do you start with?"));
    assert!(output.contains("Enter a number between 10 and 25."));
}
